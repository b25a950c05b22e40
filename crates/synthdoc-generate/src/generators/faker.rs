use fake::Fake;
use fake::faker::address::en as address;
use fake::faker::barcode::en as barcode;
use fake::faker::boolean::en as boolean;
use fake::faker::color::en as color;
use fake::faker::company::en as company;
use fake::faker::creditcard::en as creditcard;
use fake::faker::currency::en as currency;
use fake::faker::filesystem::en as filesystem;
use fake::faker::finance::en as finance;
use fake::faker::internet::en as internet;
use fake::faker::job::en as job;
use fake::faker::lorem::en as lorem;
use fake::faker::name::en as name;
use fake::faker::phone_number::en as phone;
use rand::{Rng, RngCore};

use crate::errors::GenerationError;
use crate::generators::{GeneratorContext, GeneratorRegistry, ValueGenerator};

/// Ids backed by the `fake` crate's English data set.
pub const FAKER_IDS: &[&str] = &[
    "address",
    "boolean",
    "bs",
    "building_number",
    "buzzword",
    "catch_phrase",
    "cell_phone",
    "city",
    "city_prefix",
    "city_suffix",
    "color_name",
    "company",
    "company_email",
    "company_suffix",
    "country",
    "country_code",
    "credit_card_number",
    "currency_code",
    "currency_name",
    "currency_symbol",
    "domain_name",
    "email",
    "file_extension",
    "file_name",
    "file_path",
    "first_name",
    "free_email",
    "geohash",
    "hex_color",
    "hostname",
    "industry",
    "ipv4",
    "ipv6",
    "isbn10",
    "isbn13",
    "isin",
    "job",
    "last_name",
    "latitude",
    "longitude",
    "mac_address",
    "mime_type",
    "name",
    "paragraph",
    "password",
    "phone_number",
    "postcode",
    "prefix",
    "profession",
    "safe_email",
    "secondary_address",
    "sentence",
    "state",
    "state_abbr",
    "street_address",
    "street_name",
    "street_suffix",
    "suffix",
    "swift",
    "text",
    "timezone",
    "tld",
    "url",
    "user_agent",
    "user_name",
    "word",
    "words",
    "zipcode",
];

pub fn register(registry: &mut GeneratorRegistry) {
    for &id in FAKER_IDS {
        registry.register_generator(Box::new(FakerGenerator { id }));
    }
}

struct FakerGenerator {
    id: &'static str,
}

impl ValueGenerator for FakerGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        generate_value(self.id, rng).ok_or_else(|| {
            GenerationError::InvalidOptions(format!("faker id '{}' has no producer", self.id))
        })
    }
}

/// Produce a value for a faker id, or `None` when the id is not in the catalog.
pub fn generate_value(id: &str, rng: &mut dyn RngCore) -> Option<String> {
    let value: String = match id {
        "name" => name::Name().fake_with_rng(rng),
        "first_name" => name::FirstName().fake_with_rng(rng),
        "last_name" => name::LastName().fake_with_rng(rng),
        "prefix" => name::Title().fake_with_rng(rng),
        "suffix" => name::Suffix().fake_with_rng(rng),
        "address" => {
            let street = street_address(rng);
            let city: String = address::CityName().fake_with_rng(rng);
            let state: String = address::StateAbbr().fake_with_rng(rng);
            let zip: String = address::ZipCode().fake_with_rng(rng);
            format!("{street}, {city}, {state} {zip}")
        }
        "street_address" => street_address(rng),
        "street_name" => address::StreetName().fake_with_rng(rng),
        "street_suffix" => address::StreetSuffix().fake_with_rng(rng),
        "building_number" => address::BuildingNumber().fake_with_rng(rng),
        "secondary_address" => address::SecondaryAddress().fake_with_rng(rng),
        "city" => address::CityName().fake_with_rng(rng),
        "city_prefix" => address::CityPrefix().fake_with_rng(rng),
        "city_suffix" => address::CitySuffix().fake_with_rng(rng),
        "state" => address::StateName().fake_with_rng(rng),
        "state_abbr" => address::StateAbbr().fake_with_rng(rng),
        "country" => address::CountryName().fake_with_rng(rng),
        "country_code" => address::CountryCode().fake_with_rng(rng),
        "zipcode" => address::ZipCode().fake_with_rng(rng),
        "postcode" => address::PostCode().fake_with_rng(rng),
        "company" => company::CompanyName().fake_with_rng(rng),
        "company_suffix" => company::CompanySuffix().fake_with_rng(rng),
        "catch_phrase" => company::CatchPhrase().fake_with_rng(rng),
        "bs" => company::Bs().fake_with_rng(rng),
        "job" => job::Title().fake_with_rng(rng),
        "email" | "safe_email" => internet::SafeEmail().fake_with_rng(rng),
        "free_email" => internet::FreeEmail().fake_with_rng(rng),
        "company_email" => {
            let user: String = internet::Username().fake_with_rng(rng);
            format!("{}@{}", user.to_lowercase(), domain_name(rng))
        }
        "user_name" => internet::Username().fake_with_rng(rng),
        "domain_name" => domain_name(rng),
        "hostname" => {
            let host = format!("{}-{:02}", lorem_word(rng), rng.random_range(1..=99));
            format!("{host}.{}", domain_name(rng))
        }
        "url" => format!("https://www.{}/", domain_name(rng)),
        "tld" => internet::DomainSuffix().fake_with_rng(rng),
        "ipv4" => internet::IPv4().fake_with_rng(rng),
        "ipv6" => internet::IPv6().fake_with_rng(rng),
        "mac_address" => internet::MACAddress().fake_with_rng(rng),
        "phone_number" => phone::PhoneNumber().fake_with_rng(rng),
        "word" => lorem_word(rng),
        "words" => {
            let words: Vec<String> = lorem::Words(3..4).fake_with_rng(rng);
            words.join(" ")
        }
        "sentence" => lorem::Sentence(4..10).fake_with_rng(rng),
        "paragraph" => lorem::Paragraph(3..5).fake_with_rng(rng),
        "text" => lorem::Sentence(8..16).fake_with_rng(rng),
        "currency_code" => currency::CurrencyCode().fake_with_rng(rng),
        "currency_name" => currency::CurrencyName().fake_with_rng(rng),
        "credit_card_number" => creditcard::CreditCardNumber().fake_with_rng(rng),
        "isbn10" => barcode::Isbn10().fake_with_rng(rng),
        "isbn13" => barcode::Isbn13().fake_with_rng(rng),
        "swift" => finance::Bic().fake_with_rng(rng),
        "color_name" => color::Color().fake_with_rng(rng),
        "hex_color" => color::HexColor().fake_with_rng(rng),
        "file_name" => filesystem::FileName().fake_with_rng(rng),
        "file_extension" => filesystem::FileExtension().fake_with_rng(rng),
        "mime_type" => filesystem::MimeType().fake_with_rng(rng),
        "file_path" => filesystem::FilePath().fake_with_rng(rng),
        "latitude" => {
            let degrees: f64 = address::Latitude().fake_with_rng(rng);
            format!("{degrees:.6}")
        }
        // fake's Longitude spans [-90, 270).
        "longitude" => format!("{:.6}", rng.random_range(-180.0..=180.0f64)),
        "geohash" => address::Geohash(7).fake_with_rng(rng),
        "timezone" => address::TimeZone().fake_with_rng(rng),
        "password" => internet::Password(10..17).fake_with_rng(rng),
        "user_agent" => internet::UserAgent().fake_with_rng(rng),
        "currency_symbol" => currency::CurrencySymbol().fake_with_rng(rng),
        "cell_phone" => phone::CellNumber().fake_with_rng(rng),
        "buzzword" => company::Buzzword().fake_with_rng(rng),
        "industry" => company::Industry().fake_with_rng(rng),
        "profession" => company::Profession().fake_with_rng(rng),
        "isin" => finance::Isin().fake_with_rng(rng),
        "boolean" => {
            let value: bool = boolean::Boolean(50).fake_with_rng(rng);
            let value = if value { "True" } else { "False" };
            value.to_string()
        }
        _ => return None,
    };
    Some(value)
}

fn street_address(rng: &mut dyn RngCore) -> String {
    let number: String = address::BuildingNumber().fake_with_rng(rng);
    let street: String = address::StreetName().fake_with_rng(rng);
    format!("{number} {street}")
}

fn domain_name(rng: &mut dyn RngCore) -> String {
    let suffix: String = internet::DomainSuffix().fake_with_rng(rng);
    format!("{}.{suffix}", lorem_word(rng))
}

fn lorem_word(rng: &mut dyn RngCore) -> String {
    lorem::Word().fake_with_rng(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn every_catalog_id_has_a_producer() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for id in FAKER_IDS {
            assert!(generate_value(id, &mut rng).is_some(), "no producer for {id}");
        }
        assert!(generate_value("not_a_faker_id", &mut rng).is_none());
    }

    #[test]
    fn street_address_starts_with_building_number() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let value = generate_value("street_address", &mut rng).expect("value");
        let first = value.split(' ').next().expect("token");
        assert!(first.chars().all(|ch| ch.is_ascii_digit()), "{value}");
    }

    #[test]
    fn coordinates_are_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..20 {
            let lat: f64 = generate_value("latitude", &mut rng)
                .expect("latitude")
                .parse()
                .expect("numeric latitude");
            let lon: f64 = generate_value("longitude", &mut rng)
                .expect("longitude")
                .parse()
                .expect("numeric longitude");
            assert!((-90.0..=90.0).contains(&lat), "{lat}");
            assert!((-180.0..=180.0).contains(&lon), "{lon}");
        }
    }

    #[test]
    fn password_and_boolean_follow_their_shapes() {
        let mut rng = ChaCha8Rng::seed_from_u64(10);
        let password = generate_value("password", &mut rng).expect("password");
        assert!((10..17).contains(&password.chars().count()), "{password}");
        let flag = generate_value("boolean", &mut rng).expect("boolean");
        assert!(flag == "True" || flag == "False", "{flag}");
    }
}
