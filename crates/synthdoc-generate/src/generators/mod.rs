use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};
use rand::RngCore;

use synthdoc_core::{ValueSource, ValueSourceKind};

use crate::errors::GenerationError;

pub mod custom;
pub mod faker;
pub mod numeric;
pub mod temporal;

/// Canonical rendering of every generated date.
pub const DATE_FORMAT: &str = "%d/%m/%Y";
/// Canonical rendering of every generated time of day.
pub const TIME_FORMAT: &str = "%H:%M:%S";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Read-only inputs shared by every generator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorContext {
    /// "Today" for relative dates. Never read from the wall clock.
    pub reference_date: NaiveDate,
}

/// Produces a field value from a random stream.
///
/// Implementations hold no mutable state; all randomness comes from `rng`.
pub trait ValueGenerator: Send + Sync {
    fn id(&self) -> &'static str;

    fn generate(
        &self,
        ctx: &GeneratorContext,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError>;
}

/// Id -> generator lookup for one value-source kind.
pub struct GeneratorRegistry {
    kind: ValueSourceKind,
    generators: BTreeMap<&'static str, Box<dyn ValueGenerator>>,
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("kind", &self.kind)
            .field("ids", &self.ids())
            .finish()
    }
}

impl GeneratorRegistry {
    pub fn new(kind: ValueSourceKind) -> Self {
        Self {
            kind,
            generators: BTreeMap::new(),
        }
    }

    /// Registry of general purpose generators: names, addresses, dates, numbers.
    pub fn builtin() -> Self {
        let mut registry = Self::new(ValueSourceKind::Builtin);
        faker::register(&mut registry);
        temporal::register(&mut registry);
        numeric::register(&mut registry);
        registry
    }

    /// Registry of document specific generators.
    pub fn custom() -> Self {
        let mut registry = Self::new(ValueSourceKind::Custom);
        custom::register(&mut registry);
        registry
    }

    pub fn register_generator(&mut self, generator: Box<dyn ValueGenerator>) {
        self.generators.insert(generator.id(), generator);
    }

    pub fn kind(&self) -> ValueSourceKind {
        self.kind
    }

    pub fn get(&self, id: &str) -> Option<&dyn ValueGenerator> {
        self.generators.get(id).map(|generator| generator.as_ref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.generators.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<&'static str> {
        self.generators.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

/// The builtin and custom registries, resolved by value-source tag.
#[derive(Debug)]
pub struct RegistrySet {
    builtin: GeneratorRegistry,
    custom: GeneratorRegistry,
    context: GeneratorContext,
}

impl RegistrySet {
    pub fn new(reference_date: NaiveDate) -> Result<Self, GenerationError> {
        Self::from_registries(
            GeneratorRegistry::builtin(),
            GeneratorRegistry::custom(),
            GeneratorContext { reference_date },
        )
    }

    /// Combine two registries; an id may live in only one of them.
    pub fn from_registries(
        builtin: GeneratorRegistry,
        custom: GeneratorRegistry,
        context: GeneratorContext,
    ) -> Result<Self, GenerationError> {
        let set = Self {
            builtin,
            custom,
            context,
        };
        let overlapping = set.overlapping_ids();
        if !overlapping.is_empty() {
            return Err(GenerationError::InvalidOptions(format!(
                "generator ids registered as both builtin and custom: {}",
                overlapping.join(", ")
            )));
        }
        Ok(set)
    }

    pub fn context(&self) -> &GeneratorContext {
        &self.context
    }

    pub fn registry(&self, kind: ValueSourceKind) -> &GeneratorRegistry {
        match kind {
            ValueSourceKind::Builtin => &self.builtin,
            ValueSourceKind::Custom => &self.custom,
        }
    }

    pub fn resolve(&self, source: &ValueSource) -> Result<&dyn ValueGenerator, GenerationError> {
        let kind = source.kind();
        let id = source.generator_id();
        self.registry(kind)
            .get(id)
            .ok_or_else(|| GenerationError::unknown_generator(kind, id))
    }

    pub fn validate(&self, source: &ValueSource) -> Result<(), GenerationError> {
        self.resolve(source).map(|_| ())
    }

    pub fn generate(
        &self,
        source: &ValueSource,
        rng: &mut dyn RngCore,
    ) -> Result<String, GenerationError> {
        self.resolve(source)?.generate(&self.context, rng)
    }

    pub fn overlapping_ids(&self) -> Vec<&'static str> {
        self.builtin
            .ids()
            .into_iter()
            .filter(|id| self.custom.contains(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn registries() -> RegistrySet {
        RegistrySet::new(NaiveDate::from_ymd_opt(2024, 6, 17).expect("date"))
            .expect("registries")
    }

    #[test]
    fn builtin_and_custom_ids_are_disjoint() {
        let registries = registries();
        assert!(registries.overlapping_ids().is_empty());
        assert!(!registries.registry(ValueSourceKind::Builtin).is_empty());
        assert!(!registries.registry(ValueSourceKind::Custom).is_empty());
    }

    #[test]
    fn tag_selects_the_registry() {
        let registries = registries();
        assert!(registries.validate(&ValueSource::builtin("past_date")).is_ok());
        assert!(registries.validate(&ValueSource::custom("passport_number")).is_ok());

        let err = registries
            .validate(&ValueSource::custom("past_date"))
            .expect_err("builtin id under the custom tag");
        assert!(matches!(
            err,
            GenerationError::UnknownGenerator {
                kind: ValueSourceKind::Custom,
                ..
            }
        ));
    }

    #[test]
    fn every_generator_produces_text() {
        let registries = registries();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for kind in [ValueSourceKind::Builtin, ValueSourceKind::Custom] {
            let registry = registries.registry(kind);
            for id in registry.ids() {
                let generator = registry.get(id).expect("registered id");
                let value = generator
                    .generate(registries.context(), &mut rng)
                    .unwrap_or_else(|err| panic!("{kind}:{id} failed: {err}"));
                assert!(!value.is_empty(), "{kind}:{id} produced an empty value");
            }
        }
    }

    #[test]
    fn same_seed_same_value() {
        let registries = registries();
        let source = ValueSource::builtin("name");
        let a = registries
            .generate(&source, &mut ChaCha8Rng::seed_from_u64(11))
            .expect("value");
        let b = registries
            .generate(&source, &mut ChaCha8Rng::seed_from_u64(11))
            .expect("value");
        assert_eq!(a, b);
    }
}
