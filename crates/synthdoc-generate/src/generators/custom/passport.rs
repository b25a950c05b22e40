//! Passport fields.
//!
//! Each generator draws its own values; fields of one document are not
//! cross-referenced.

use chrono::{Duration, Months, NaiveDate};
use fake::Fake;
use fake::faker::name::en::{FirstName, LastName};
use rand::{Rng, RngCore};

use crate::errors::GenerationError;
use crate::generators::numeric::{digits, digits_to_string};
use crate::generators::temporal::{date_between, date_of_birth};
use crate::generators::{GeneratorContext, GeneratorRegistry, ValueGenerator, format_date};

const ISSUING_STATE: &str = "USA";
const VALIDITY_YEARS: u32 = 10;
const MRZ_LINE_LEN: usize = 44;

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(PassportField {
        id: "passport_number",
        part: Part::Number,
    }));
    registry.register_generator(Box::new(PassportField {
        id: "passport_dob",
        part: Part::DateOfBirth,
    }));
    registry.register_generator(Box::new(PassportField {
        id: "passport_dates",
        part: Part::Dates,
    }));
    registry.register_generator(Box::new(PassportField {
        id: "passport_gender",
        part: Part::Gender,
    }));
    registry.register_generator(Box::new(PassportField {
        id: "passport_owner",
        part: Part::Owner,
    }));
    registry.register_generator(Box::new(PassportField {
        id: "passport_full",
        part: Part::Full,
    }));
    registry.register_generator(Box::new(PassportField {
        id: "mrz_line",
        part: Part::MrzLine,
    }));
}

#[derive(Clone, Copy)]
enum Part {
    Number,
    DateOfBirth,
    Dates,
    Gender,
    Owner,
    Full,
    MrzLine,
}

struct PassportField {
    id: &'static str,
    part: Part,
}

impl ValueGenerator for PassportField {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let value = match self.part {
            Part::Number => passport_number(rng),
            Part::DateOfBirth => format_date(date_of_birth(ctx.reference_date, rng)),
            Part::Dates => {
                let record = PassportRecord::draw(ctx.reference_date, rng);
                format!(
                    "{} - {} - {}",
                    format_date(record.birth),
                    format_date(record.issued),
                    format_date(record.expires)
                )
            }
            Part::Gender => gender(rng).to_string(),
            Part::Owner => {
                let given: String = FirstName().fake_with_rng(rng);
                let surname: String = LastName().fake_with_rng(rng);
                format!("{given} {surname}")
            }
            Part::Full => {
                let record = PassportRecord::draw(ctx.reference_date, rng);
                format!(
                    "{} {} {} {} {} {} {}",
                    record.given,
                    record.surname,
                    record.gender,
                    record.number,
                    format_date(record.birth),
                    format_date(record.issued),
                    format_date(record.expires)
                )
            }
            Part::MrzLine => PassportRecord::draw(ctx.reference_date, rng).mrz_data_line(),
        };
        Ok(value)
    }
}

/// One synthetic passport holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassportRecord {
    pub given: String,
    pub surname: String,
    pub number: String,
    pub gender: char,
    pub birth: NaiveDate,
    pub issued: NaiveDate,
    pub expires: NaiveDate,
}

impl PassportRecord {
    /// Draw a holder whose passport is valid at `reference`.
    pub fn draw(reference: NaiveDate, rng: &mut dyn RngCore) -> Self {
        let given = FirstName().fake_with_rng(rng);
        let surname = LastName().fake_with_rng(rng);
        let number = passport_number(rng);
        let gender = gender(rng);
        let birth = date_of_birth(reference, rng);
        let earliest_issue = reference
            .checked_sub_months(Months::new(12 * VALIDITY_YEARS))
            .map(|date| date + Duration::days(1))
            .unwrap_or(reference)
            .max(birth);
        let issued = date_between(earliest_issue, reference, rng);
        let expires = issued
            .checked_add_months(Months::new(12 * VALIDITY_YEARS))
            .unwrap_or(issued);
        Self {
            given,
            surname,
            number,
            gender,
            birth,
            issued,
            expires,
        }
    }

    /// Second line of a TD3 machine readable zone, check digits included.
    pub fn mrz_data_line(&self) -> String {
        let number = mrz_field(&self.number, 9);
        let birth = self.birth.format("%y%m%d").to_string();
        let expires = self.expires.format("%y%m%d").to_string();
        let personal = "<".repeat(14);
        let sex = match self.gender {
            'M' | 'F' => self.gender,
            _ => '<',
        };

        let number_check = mrz_check_digit(&number);
        let birth_check = mrz_check_digit(&birth);
        let expires_check = mrz_check_digit(&expires);
        let personal_check = mrz_check_digit(&personal);
        let composite = format!(
            "{number}{number_check}{birth}{birth_check}{expires}{expires_check}{personal}{personal_check}"
        );
        let composite_check = mrz_check_digit(&composite);

        let line = format!(
            "{number}{number_check}{ISSUING_STATE}{birth}{birth_check}{sex}{expires}{expires_check}{personal}{personal_check}{composite_check}"
        );
        debug_assert_eq!(line.len(), MRZ_LINE_LEN);
        line
    }
}

fn passport_number(rng: &mut dyn RngCore) -> String {
    let letter = char::from(b'A' + rng.random_range(0..26u8));
    format!("{letter}{}", digits_to_string(&digits(rng, 8)))
}

fn gender(rng: &mut dyn RngCore) -> char {
    match rng.random_range(0..200u32) {
        0..=98 => 'M',
        99..=197 => 'F',
        _ => 'X',
    }
}

/// Uppercase, fill non alphanumerics with `<`, pad or cut to `width`.
fn mrz_field(value: &str, width: usize) -> String {
    let mut field: String = value
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase()
            } else {
                '<'
            }
        })
        .take(width)
        .collect();
    while field.len() < width {
        field.push('<');
    }
    field
}

/// ICAO 9303 check digit: weights 7,3,1; letters count 10..35, filler 0.
pub fn mrz_check_digit(value: &str) -> char {
    const WEIGHTS: [u32; 3] = [7, 3, 1];
    let sum: u32 = value
        .chars()
        .enumerate()
        .map(|(pos, ch)| ch.to_digit(36).unwrap_or(0) * WEIGHTS[pos % 3])
        .sum();
    char::from(b'0' + (sum % 10) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 17).expect("date")
    }

    #[test]
    fn check_digit_matches_icao_sample() {
        // Document number from the ICAO 9303 specimen passport.
        assert_eq!(mrz_check_digit("L898902C3"), '6');
        assert_eq!(mrz_check_digit("740812"), '2');
    }

    #[test]
    fn record_is_valid_at_reference() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        for _ in 0..50 {
            let record = PassportRecord::draw(reference(), &mut rng);
            assert!(record.birth <= record.issued);
            assert!(record.issued <= reference());
            assert!(record.expires > reference());
            assert_eq!(record.number.len(), 9);
        }
    }

    #[test]
    fn mrz_data_line_has_fixed_width() {
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let record = PassportRecord::draw(reference(), &mut rng);
        let line = record.mrz_data_line();
        assert_eq!(line.len(), MRZ_LINE_LEN);
        assert_eq!(&line[10..13], ISSUING_STATE);
        assert!(line.chars().all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '<'));
    }
}
