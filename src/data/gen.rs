use crate::core::{Expedite, Instance, MaterialSpec, ProductSpec};
use rand::prelude::*;
use std::num::NonZero;

/// Parameters of randomly generated instances.
#[derive(Clone, Debug)]
pub struct GenConfig {
    pub products: NonZero<usize>,
    pub materials: NonZero<usize>,
    /// Generates the line-sequencing variant with this many lines.
    pub lines: Option<NonZero<usize>>,
    /// Gives every material an expedite channel.
    pub expedite: bool,
}

/// Seedable generator of valid instances.
#[derive(Clone, Debug)]
pub struct Generator {
    rng: StdRng,
}

impl Generator {
    /// Creates a generator with a fixed seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let rng = StdRng::seed_from_u64(seed);
        Self { rng }
    }

    /// Generates an instance. Lines are capped by the number of products.
    pub fn generate(&mut self, config: &GenConfig) -> Instance {
        let materials = self.gen_materials(config.materials.get(), config.expedite);
        let sequencing = config.lines.is_some();
        let products = self.gen_products(config.products.get(), &materials, sequencing);

        let instance = Instance::new(products, materials);
        match config.lines {
            Some(lines) => instance.with_lines(lines.get().min(config.products.get())),
            None => instance,
        }
    }

    fn gen_materials(&mut self, count: usize, expedite: bool) -> Vec<MaterialSpec> {
        (0..count)
            .map(|i| {
                let lead_time = f64::from(self.rng.gen_range(15..=30_u32));
                let inventory = f64::from(self.rng.gen_range(20..=60_u32));
                let expedite = expedite.then(|| Expedite {
                    lead_time: f64::from(self.rng.gen_range(0..=5_u32)),
                    capacity: f64::from(self.rng.gen_range(20..=100_u32)),
                });
                MaterialSpec {
                    id: format!("R{}", i + 1),
                    inventory,
                    lead_time,
                    expedite,
                }
            })
            .collect()
    }

    fn gen_products(
        &mut self,
        count: usize,
        materials: &[MaterialSpec],
        sequencing: bool,
    ) -> Vec<ProductSpec> {
        let least = (materials.len() * 2).div_ceil(3);
        let least = least.clamp(1, materials.len());

        (0..count)
            .map(|i| {
                let used = self.rng.gen_range(least..=materials.len());
                let requirements = materials
                    .choose_multiple(&mut self.rng, used)
                    .map(|m| (m.id.clone(), self.rng.gen_range(3..=10_u64)))
                    .collect();
                let processing_time = if sequencing {
                    f64::from(self.rng.gen_range(1..=5_u32))
                } else {
                    0.0
                };
                ProductSpec {
                    id: format!("P{}", i + 1),
                    due: f64::from(self.rng.gen_range(5..=20_u32)),
                    processing_time,
                    requirements,
                }
            })
            .collect()
    }
}

impl Default for Generator {
    fn default() -> Self {
        let rng = StdRng::from_entropy();
        Self { rng }
    }
}
