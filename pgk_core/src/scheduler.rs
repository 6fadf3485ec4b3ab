//! The two daily jobs of every entry.
//!
//! At midnight a random moment between 00:00 and 04:59 is picked and the schedule is
//! refreshed then, so that not every installation hits the website at once. Five seconds
//! after midnight the sensor states are recomputed, because "jutro" became "dziś".

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, LocalResult, NaiveDateTime, NaiveTime, Offset, TimeZone};
use rand::Rng;
use tokio::task::JoinHandle;

use crate::{coordinator::Coordinator, garbage_client::ScheduleSource};

pub const REFRESH_HOURS: std::ops::RangeInclusive<u32> = 0..=4;
pub const REFRESH_MINUTES: std::ops::RangeInclusive<u32> = 0..=59;

fn midnight() -> NaiveTime {
    NaiveTime::MIN
}

fn recompute_time() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 0, 5).unwrap_or(NaiveTime::MIN)
}

/// The instant showing `local` on the wall clock of `tz`.
///
/// A time shown twice maps to its first occurrence. A time skipped by a DST change maps
/// to the moment right after the gap.
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(time) => time,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let before = tz
                .offset_from_utc_datetime(&(local - chrono::Duration::days(1)))
                .fix();
            let utc = local - chrono::Duration::seconds(before.local_minus_utc().into());
            tz.from_utc_datetime(&utc)
        }
    }
}

/// The first moment strictly after `now` showing `time` on the wall clock.
pub fn next_time_of_day<Tz: TimeZone>(now: &DateTime<Tz>, time: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.naive_local().date();
    loop {
        let candidate = resolve_local(&tz, date.and_time(time));
        if candidate > *now {
            return candidate;
        }
        date += chrono::Duration::days(1);
    }
}

/// Today at `hour:minute`, or tomorrow when that is not in the future anymore.
pub fn night_refresh_target<Tz: TimeZone>(
    now: &DateTime<Tz>,
    hour: u32,
    minute: u32,
) -> DateTime<Tz> {
    let tz = now.timezone();
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    let today = now.naive_local().date();
    let target = resolve_local(&tz, today.and_time(time));
    if target <= *now {
        resolve_local(&tz, (today + chrono::Duration::days(1)).and_time(time))
    } else {
        target
    }
}

pub fn random_refresh_time<R: Rng>(rng: &mut R) -> (u32, u32) {
    (rng.gen_range(REFRESH_HOURS), rng.gen_range(REFRESH_MINUTES))
}

/// Real time left until `target`, zero when it has passed.
pub fn delay_until<Tz: TimeZone>(now: &DateTime<Tz>, target: &DateTime<Tz>) -> Duration {
    (target.clone() - now.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

async fn sleep_until_next(time: NaiveTime) {
    let now = chrono::Local::now();
    tokio::time::sleep(delay_until(&now, &next_time_of_day(&now, time))).await;
}

async fn daily_refresh<S: ScheduleSource + 'static>(coordinator: Arc<Coordinator<S>>) {
    loop {
        sleep_until_next(midnight()).await;
        if coordinator.is_retrying() {
            tracing::info!(
                "{}: a refresh is still being retried, not scheduling another",
                coordinator.entry().entry_id
            );
            continue;
        }
        let now = chrono::Local::now();
        let (hour, minute) = random_refresh_time(&mut rand::thread_rng());
        let target = night_refresh_target(&now, hour, minute);
        let delay = delay_until(&now, &target);
        tracing::info!(
            "{}: next refresh at {target} (in {:?})",
            coordinator.entry().entry_id,
            delay
        );
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            coordinator.retry_update_data().await;
        });
    }
}

async fn daily_recompute<S: ScheduleSource + 'static>(coordinator: Arc<Coordinator<S>>) {
    loop {
        sleep_until_next(recompute_time()).await;
        tracing::info!("{}: recomputing sensor states", coordinator.entry().entry_id);
        coordinator
            .recompute_states(chrono::Local::now().naive_local())
            .await;
    }
}

/// Run both daily jobs of a coordinator until the returned tasks are aborted.
pub fn spawn<S: ScheduleSource + 'static>(
    coordinator: Arc<Coordinator<S>>,
) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(daily_refresh(coordinator.clone())),
        tokio::spawn(daily_recompute(coordinator)),
    ]
}

#[cfg(test)]
mod tests {
    use std::{str::FromStr, time::Duration};

    use chrono::{
        DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
    };
    use rand::{rngs::StdRng, SeedableRng};

    use crate::scheduler::{
        delay_until, next_time_of_day, night_refresh_target, random_refresh_time, resolve_local,
    };

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::from_str(s).unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        Utc.from_utc_datetime(&at(s))
    }

    /// Central European time around the end of summer time on 2025-10-26.
    #[derive(Debug, Clone, Copy)]
    struct AutumnChange;

    fn summer() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    fn winter() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    impl TimeZone for AutumnChange {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            AutumnChange
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            if *local < at("2025-10-26T02:00:00") {
                LocalResult::Single(summer())
            } else if *local < at("2025-10-26T03:00:00") {
                LocalResult::Ambiguous(summer(), winter())
            } else {
                LocalResult::Single(winter())
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < at("2025-10-26T01:00:00") {
                summer()
            } else {
                winter()
            }
        }
    }

    fn autumn(s: &str) -> DateTime<AutumnChange> {
        resolve_local(&AutumnChange, at(s))
    }

    #[test]
    fn test_next_time_of_day() {
        let five = NaiveTime::from_hms_opt(0, 0, 5).unwrap();
        assert_eq!(
            next_time_of_day(&utc("2025-01-15T00:00:00"), five),
            utc("2025-01-15T00:00:05")
        );
        assert_eq!(
            next_time_of_day(&utc("2025-01-15T00:00:05"), five),
            utc("2025-01-16T00:00:05")
        );
        assert_eq!(
            next_time_of_day(&utc("2025-12-31T23:59:59"), NaiveTime::MIN),
            utc("2026-01-01T00:00:00")
        );
    }

    #[test]
    fn test_night_refresh_target() {
        let now = utc("2025-01-15T00:00:00");
        assert_eq!(night_refresh_target(&now, 3, 17), utc("2025-01-15T03:17:00"));
        assert_eq!(night_refresh_target(&now, 0, 0), utc("2025-01-16T00:00:00"));
        let late = utc("2025-01-15T04:30:00");
        assert_eq!(night_refresh_target(&late, 2, 0), utc("2025-01-16T02:00:00"));
    }

    #[test]
    fn test_delays_follow_real_time_across_dst_change() {
        let now = autumn("2025-10-26T00:00:00");
        let midnight = next_time_of_day(&now, NaiveTime::MIN);
        assert_eq!(midnight.naive_local(), at("2025-10-27T00:00:00"));
        assert_eq!(delay_until(&now, &midnight), Duration::from_secs(25 * 3600));

        let five = NaiveTime::from_hms_opt(0, 0, 5).unwrap();
        let recompute = next_time_of_day(&now, five);
        assert_eq!(delay_until(&now, &recompute), Duration::from_secs(5));
        let after = next_time_of_day(&recompute, five);
        assert_eq!(
            delay_until(&recompute, &after),
            Duration::from_secs(25 * 3600)
        );
    }

    #[test]
    fn test_ambiguous_time_uses_first_occurrence() {
        let now = autumn("2025-10-26T00:00:00");
        let target = night_refresh_target(&now, 2, 30);
        assert_eq!(target.offset(), &summer());
        assert_eq!(delay_until(&now, &target), Duration::from_secs(9000));
    }

    #[test]
    fn test_random_refresh_time_in_window() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let (hour, minute) = random_refresh_time(&mut rng);
            assert!(hour <= 4);
            assert!(minute <= 59);
        }
    }

    #[test]
    fn test_delay_until() {
        let now = utc("2025-01-15T00:00:00");
        assert_eq!(
            delay_until(&now, &utc("2025-01-15T01:00:00")),
            Duration::from_secs(3600)
        );
        assert_eq!(
            delay_until(&now, &utc("2025-01-14T23:00:00")),
            Duration::ZERO
        );
    }
}
