use synthdoc_generate::generators::GeneratorRegistry;

fn main() {
    for registry in [GeneratorRegistry::builtin(), GeneratorRegistry::custom()] {
        let kind = registry.kind();
        for id in registry.ids() {
            println!("{kind}:{id}");
        }
    }
}
