use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use rand::{Rng, RngCore};

use crate::errors::GenerationError;
use crate::generators::{
    GeneratorContext, GeneratorRegistry, ValueGenerator, format_date, format_time,
};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];
const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
const RELATIVE_WINDOW_DAYS: i64 = 30;
const MIN_AGE_YEARS: u32 = 18;
const MAX_AGE_YEARS: u32 = 80;

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(DateGenerator));
    registry.register_generator(Box::new(RelativeDateGenerator {
        id: "past_date",
        direction: -1,
    }));
    registry.register_generator(Box::new(RelativeDateGenerator {
        id: "future_date",
        direction: 1,
    }));
    registry.register_generator(Box::new(DateOfBirthGenerator));
    registry.register_generator(Box::new(PeriodDateGenerator {
        id: "date_this_year",
        period: Period::Year,
    }));
    registry.register_generator(Box::new(PeriodDateGenerator {
        id: "date_this_month",
        period: Period::Month,
    }));
    registry.register_generator(Box::new(PeriodDateGenerator {
        id: "date_this_decade",
        period: Period::Decade,
    }));
    registry.register_generator(Box::new(CalendarPartGenerator {
        id: "year",
        part: CalendarPart::Year,
    }));
    registry.register_generator(Box::new(CalendarPartGenerator {
        id: "month",
        part: CalendarPart::Month,
    }));
    registry.register_generator(Box::new(CalendarPartGenerator {
        id: "month_name",
        part: CalendarPart::MonthName,
    }));
    registry.register_generator(Box::new(CalendarPartGenerator {
        id: "day_of_month",
        part: CalendarPart::DayOfMonth,
    }));
    registry.register_generator(Box::new(CalendarPartGenerator {
        id: "day_of_week",
        part: CalendarPart::DayOfWeek,
    }));
    registry.register_generator(Box::new(TimeGenerator));
    for (id, style) in [
        ("date_time", TimestampStyle::Canonical),
        ("iso8601", TimestampStyle::Iso8601),
        ("unix_time", TimestampStyle::Unix),
    ] {
        registry.register_generator(Box::new(TimestampGenerator { id, style }));
    }
    registry.register_generator(Box::new(AmPmGenerator));
}

/// Uniform day in `[min, max]`.
pub fn date_between(min: NaiveDate, max: NaiveDate, rng: &mut dyn RngCore) -> NaiveDate {
    let span = (max - min).num_days().max(0);
    min + Duration::days(rng.random_range(0..=span))
}

/// Birth date for an adult aged between 18 and 80 at the reference date.
pub fn date_of_birth(reference: NaiveDate, rng: &mut dyn RngCore) -> NaiveDate {
    let youngest = reference
        .checked_sub_months(Months::new(12 * MIN_AGE_YEARS))
        .unwrap_or(reference);
    let oldest = reference
        .checked_sub_months(Months::new(12 * (MAX_AGE_YEARS + 1)))
        .map(|date| date + Duration::days(1))
        .unwrap_or(youngest);
    date_between(oldest, youngest, rng)
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

struct DateGenerator;

impl ValueGenerator for DateGenerator {
    fn id(&self) -> &'static str {
        "date"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        Ok(format_date(date_between(epoch(), ctx.reference_date, rng)))
    }
}

struct RelativeDateGenerator {
    id: &'static str,
    direction: i64,
}

impl ValueGenerator for RelativeDateGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let days = rng.random_range(1..=RELATIVE_WINDOW_DAYS) * self.direction;
        Ok(format_date(ctx.reference_date + Duration::days(days)))
    }
}

struct DateOfBirthGenerator;

impl ValueGenerator for DateOfBirthGenerator {
    fn id(&self) -> &'static str {
        "date_of_birth"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        Ok(format_date(date_of_birth(ctx.reference_date, rng)))
    }
}

#[derive(Clone, Copy)]
enum Period {
    Month,
    Year,
    Decade,
}

struct PeriodDateGenerator {
    id: &'static str,
    period: Period,
}

impl ValueGenerator for PeriodDateGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let reference = ctx.reference_date;
        let start = match self.period {
            Period::Month => reference.with_day(1),
            Period::Year => NaiveDate::from_ymd_opt(reference.year(), 1, 1),
            Period::Decade => NaiveDate::from_ymd_opt(reference.year() - reference.year() % 10, 1, 1),
        }
        .unwrap_or(reference);
        Ok(format_date(date_between(start, reference, rng)))
    }
}

#[derive(Clone, Copy)]
enum CalendarPart {
    Year,
    Month,
    MonthName,
    DayOfMonth,
    DayOfWeek,
}

struct CalendarPartGenerator {
    id: &'static str,
    part: CalendarPart,
}

impl ValueGenerator for CalendarPartGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let date = date_between(epoch(), ctx.reference_date, rng);
        let value = match self.part {
            CalendarPart::Year => date.year().to_string(),
            CalendarPart::Month => format!("{:02}", date.month()),
            CalendarPart::MonthName => MONTH_NAMES[date.month0() as usize].to_string(),
            CalendarPart::DayOfMonth => format!("{:02}", date.day()),
            CalendarPart::DayOfWeek => {
                WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize].to_string()
            }
        };
        Ok(value)
    }
}

struct TimeGenerator;

impl ValueGenerator for TimeGenerator {
    fn id(&self) -> &'static str {
        "time"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let seconds = rng.random_range(0..86_400u32);
        Ok(NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
            .map(format_time)
            .unwrap_or_else(|| "00:00:00".to_string()))
    }
}

#[derive(Clone, Copy)]
enum TimestampStyle {
    Canonical,
    Iso8601,
    Unix,
}

/// Instant between the epoch and the end of the reference day.
struct TimestampGenerator {
    id: &'static str,
    style: TimestampStyle,
}

impl ValueGenerator for TimestampGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let date = date_between(epoch(), ctx.reference_date, rng);
        let time = NaiveTime::from_num_seconds_from_midnight_opt(rng.random_range(0..86_400u32), 0)
            .unwrap_or(NaiveTime::MIN);
        let instant = NaiveDateTime::new(date, time);
        let value = match self.style {
            TimestampStyle::Canonical => format!("{} {}", format_date(date), format_time(time)),
            TimestampStyle::Iso8601 => instant.format("%Y-%m-%dT%H:%M:%S").to_string(),
            TimestampStyle::Unix => instant.and_utc().timestamp().to_string(),
        };
        Ok(value)
    }
}

struct AmPmGenerator;

impl ValueGenerator for AmPmGenerator {
    fn id(&self) -> &'static str {
        "am_pm"
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let value = if rng.random_bool(0.5) { "AM" } else { "PM" };
        Ok(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx() -> GeneratorContext {
        GeneratorContext {
            reference_date: NaiveDate::from_ymd_opt(2024, 6, 17).expect("date"),
        }
    }

    fn parse(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, crate::generators::DATE_FORMAT)
            .unwrap_or_else(|err| panic!("'{value}' is not a canonical date: {err}"))
    }

    #[test]
    fn past_and_future_dates_straddle_the_reference() {
        let ctx = ctx();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let past = RelativeDateGenerator {
            id: "past_date",
            direction: -1,
        };
        let future = RelativeDateGenerator {
            id: "future_date",
            direction: 1,
        };
        for _ in 0..50 {
            let before = parse(&past.generate(&ctx, &mut rng).expect("past"));
            let after = parse(&future.generate(&ctx, &mut rng).expect("future"));
            assert!(before < ctx.reference_date);
            assert!(before >= ctx.reference_date - Duration::days(RELATIVE_WINDOW_DAYS));
            assert!(after > ctx.reference_date);
        }
    }

    #[test]
    fn date_of_birth_is_an_adult() {
        let ctx = ctx();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..100 {
            let born = date_of_birth(ctx.reference_date, &mut rng);
            let age = ctx.reference_date.years_since(born).expect("born before reference");
            assert!((MIN_AGE_YEARS..=MAX_AGE_YEARS).contains(&age), "age {age}");
        }
    }

    #[test]
    fn dates_this_year_stay_in_the_reference_year() {
        let ctx = ctx();
        let generator = PeriodDateGenerator {
            id: "date_this_year",
            period: Period::Year,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..50 {
            let date = parse(&generator.generate(&ctx, &mut rng).expect("date"));
            assert_eq!(date.year(), 2024);
            assert!(date <= ctx.reference_date);
        }
    }

    #[test]
    fn time_uses_the_canonical_format() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let value = TimeGenerator.generate(&ctx(), &mut rng).expect("time");
        assert!(NaiveTime::parse_from_str(&value, crate::generators::TIME_FORMAT).is_ok());
    }

    #[test]
    fn timestamps_never_pass_the_reference_day() {
        let ctx = ctx();
        let end = ctx.reference_date.and_hms_opt(23, 59, 59).expect("end of day");
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let iso = TimestampGenerator {
            id: "iso8601",
            style: TimestampStyle::Iso8601,
        };
        let unix = TimestampGenerator {
            id: "unix_time",
            style: TimestampStyle::Unix,
        };
        let canonical = TimestampGenerator {
            id: "date_time",
            style: TimestampStyle::Canonical,
        };
        for _ in 0..50 {
            let value = iso.generate(&ctx, &mut rng).expect("iso8601");
            let parsed = NaiveDateTime::parse_from_str(&value, "%Y-%m-%dT%H:%M:%S").expect("iso");
            assert!(parsed <= end);

            let seconds: i64 = unix.generate(&ctx, &mut rng).expect("unix").parse().expect("int");
            assert!((0..=end.and_utc().timestamp()).contains(&seconds));

            let value = canonical.generate(&ctx, &mut rng).expect("date_time");
            let (date, time) = value.split_once(' ').expect("date and time");
            assert!(parse(date) <= ctx.reference_date);
            assert!(NaiveTime::parse_from_str(time, crate::generators::TIME_FORMAT).is_ok());
        }
    }
}
