use crate::generators::GeneratorRegistry;

pub mod invoice;
pub mod passport;

pub fn register(registry: &mut GeneratorRegistry) {
    passport::register(registry);
    invoice::register(registry);
}
