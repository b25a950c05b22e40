use chrono::Datelike;
use rand::{Rng, RngCore};

use crate::errors::GenerationError;
use crate::generators::{GeneratorContext, GeneratorRegistry, ValueGenerator};

pub fn register(registry: &mut GeneratorRegistry) {
    registry.register_generator(Box::new(InvoiceNumberGenerator));
}

/// `INV-<year>-<six digits>`, year taken from the reference date.
struct InvoiceNumberGenerator;

impl ValueGenerator for InvoiceNumberGenerator {
    fn id(&self) -> &'static str {
        "invoice_number"
    }

    fn generate(
        &self,
        ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        let serial = rng.random_range(1..=999_999u32);
        Ok(format!("INV-{}-{serial:06}", ctx.reference_date.year()))
    }
}
