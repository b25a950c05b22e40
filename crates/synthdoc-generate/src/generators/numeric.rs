use rand::{Rng, RngCore};

use crate::errors::GenerationError;
use crate::generators::{GeneratorContext, GeneratorRegistry, ValueGenerator};

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const VIN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPRSTUVWXYZ0123456789";

type Produce = fn(&mut dyn RngCore) -> String;

const NUMERIC_GENERATORS: &[(&str, Produce)] = &[
    ("aba", aba),
    ("bban", bban),
    ("ean8", ean8),
    ("ean13", ean13),
    ("ein", ein),
    ("iban", iban),
    ("itin", itin),
    ("license_plate", license_plate),
    ("md5", md5),
    ("msisdn", msisdn),
    ("port_number", port_number),
    ("pricetag", pricetag),
    ("pybool", pybool),
    ("pyfloat", pyfloat),
    ("pyint", pyint),
    ("random_digit", random_digit),
    ("random_int", pyint),
    ("random_letter", random_letter),
    ("random_lowercase_letter", random_lowercase_letter),
    ("random_number", random_number),
    ("random_uppercase_letter", random_uppercase_letter),
    ("sha1", sha1),
    ("sha256", sha256),
    ("ssn", ssn),
    ("upc_a", upc_a),
    ("uuid4", uuid4),
    ("vin", vin),
];

pub fn register(registry: &mut GeneratorRegistry) {
    for &(id, produce) in NUMERIC_GENERATORS {
        registry.register_generator(Box::new(PatternGenerator { id, produce }));
    }
}

struct PatternGenerator {
    id: &'static str,
    produce: Produce,
}

impl ValueGenerator for PatternGenerator {
    fn id(&self) -> &'static str {
        self.id
    }

    fn generate(
        &self,
        _ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        Ok((self.produce)(rng))
    }
}

/// `count` random decimal digits.
pub fn digits(rng: &mut dyn RngCore, count: usize) -> Vec<u8> {
    (0..count).map(|_| rng.random_range(0..10u8)).collect()
}

pub fn digits_to_string(digits: &[u8]) -> String {
    digits.iter().map(|digit| char::from(b'0' + digit)).collect()
}

/// `count` characters drawn uniformly from `alphabet`.
pub fn pick_chars(rng: &mut dyn RngCore, alphabet: &[u8], count: usize) -> String {
    (0..count)
        .map(|_| char::from(alphabet[rng.random_range(0..alphabet.len())]))
        .collect()
}

/// GS1 check digit; weights alternate 3,1 from the rightmost payload digit.
pub fn gs1_check_digit(payload: &[u8]) -> u8 {
    let sum: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(pos, &digit)| u32::from(digit) * if pos % 2 == 0 { 3 } else { 1 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

fn gs1(rng: &mut dyn RngCore, payload_len: usize) -> String {
    let mut payload = digits(rng, payload_len);
    payload.push(gs1_check_digit(&payload));
    digits_to_string(&payload)
}

fn ean8(rng: &mut dyn RngCore) -> String {
    gs1(rng, 7)
}

fn ean13(rng: &mut dyn RngCore) -> String {
    gs1(rng, 12)
}

fn upc_a(rng: &mut dyn RngCore) -> String {
    gs1(rng, 11)
}

/// ABA routing number with its weighted 3-7-1 checksum.
fn aba(rng: &mut dyn RngCore) -> String {
    let mut number = digits(rng, 8);
    let weights = [3u32, 7, 1, 3, 7, 1, 3, 7];
    let sum: u32 = number
        .iter()
        .zip(weights)
        .map(|(&digit, weight)| u32::from(digit) * weight)
        .sum();
    number.push(((10 - sum % 10) % 10) as u8);
    digits_to_string(&number)
}

fn bban(rng: &mut dyn RngCore) -> String {
    let bank = pick_chars(rng, UPPERCASE, 4);
    let sort_and_account = digits_to_string(&digits(rng, 14));
    format!("{bank}{sort_and_account}")
}

/// GB IBAN with valid ISO 7064 mod-97 check digits.
fn iban(rng: &mut dyn RngCore) -> String {
    let bban = bban(rng);
    let check = 98 - iban_remainder(&format!("{bban}GB00"));
    format!("GB{check:02}{bban}")
}

/// Remainder mod 97 of an alphanumeric string with letters expanded to 10..35.
pub fn iban_remainder(value: &str) -> u32 {
    value.chars().fold(0u32, |acc, ch| match ch.to_digit(36) {
        Some(number) if number >= 10 => (acc * 100 + number) % 97,
        Some(number) => (acc * 10 + number) % 97,
        None => acc,
    })
}

fn ssn(rng: &mut dyn RngCore) -> String {
    let mut area = rng.random_range(1..=899u32);
    if area == 666 {
        area = 665;
    }
    let group = rng.random_range(1..=99u32);
    let serial = rng.random_range(1..=9999u32);
    format!("{area:03}-{group:02}-{serial:04}")
}

fn ein(rng: &mut dyn RngCore) -> String {
    let prefix = rng.random_range(10..=99u32);
    let body = digits_to_string(&digits(rng, 7));
    format!("{prefix}-{body}")
}

fn itin(rng: &mut dyn RngCore) -> String {
    let area = digits_to_string(&digits(rng, 2));
    let group = rng.random_range(70..=88u32);
    let serial = digits_to_string(&digits(rng, 4));
    format!("9{area}-{group}-{serial}")
}

fn license_plate(rng: &mut dyn RngCore) -> String {
    let letters = pick_chars(rng, UPPERCASE, 3);
    let numbers = digits_to_string(&digits(rng, 4));
    format!("{letters}-{numbers}")
}

fn vin(rng: &mut dyn RngCore) -> String {
    pick_chars(rng, VIN_ALPHABET, 17)
}

fn msisdn(rng: &mut dyn RngCore) -> String {
    digits_to_string(&digits(rng, 13))
}

fn port_number(rng: &mut dyn RngCore) -> String {
    rng.random_range(0..=65_535u32).to_string()
}

/// Dollar amount with thousands separators, e.g. `$1,234.56`.
fn pricetag(rng: &mut dyn RngCore) -> String {
    let cents = rng.random_range(100..=1_000_000u64);
    let dollars = (cents / 100).to_string();
    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (pos, ch) in dollars.chars().enumerate() {
        if pos > 0 && (dollars.len() - pos) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("${grouped}.{:02}", cents % 100)
}

fn pybool(rng: &mut dyn RngCore) -> String {
    let value = if rng.random_bool(0.5) { "True" } else { "False" };
    value.to_string()
}

fn pyfloat(rng: &mut dyn RngCore) -> String {
    let value: f64 = rng.random_range(-9_999.0..9_999.0);
    format!("{value:.3}")
}

fn pyint(rng: &mut dyn RngCore) -> String {
    rng.random_range(0..=9_999u32).to_string()
}

fn random_digit(rng: &mut dyn RngCore) -> String {
    rng.random_range(0..=9u32).to_string()
}

fn random_number(rng: &mut dyn RngCore) -> String {
    rng.random_range(0..1_000_000_000u64).to_string()
}

fn random_letter(rng: &mut dyn RngCore) -> String {
    if rng.random_bool(0.5) {
        random_uppercase_letter(rng)
    } else {
        random_lowercase_letter(rng)
    }
}

fn random_uppercase_letter(rng: &mut dyn RngCore) -> String {
    pick_chars(rng, UPPERCASE, 1)
}

fn random_lowercase_letter(rng: &mut dyn RngCore) -> String {
    pick_chars(rng, LOWERCASE, 1)
}

fn random_hex(rng: &mut dyn RngCore, bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rng.fill_bytes(&mut buffer);
    hex::encode(buffer)
}

fn md5(rng: &mut dyn RngCore) -> String {
    random_hex(rng, 16)
}

fn sha1(rng: &mut dyn RngCore) -> String {
    random_hex(rng, 20)
}

fn sha256(rng: &mut dyn RngCore) -> String {
    random_hex(rng, 32)
}

fn uuid4(rng: &mut dyn RngCore) -> String {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    uuid::Builder::from_random_bytes(bytes)
        .into_uuid()
        .to_string()
}
