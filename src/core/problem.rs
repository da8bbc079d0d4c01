use super::ValidationError;
use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use serde::{Deserialize, Serialize};

/// Replenishment channel of a material.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Standard,
    Expedite,
}

impl Channel {
    pub const ALL: [Self; 2] = [Self::Standard, Self::Expedite];

    /// Position of the channel in [`Channel::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Standard => 0,
            Self::Expedite => 1,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Expedite => write!(f, "expedite"),
        }
    }
}

/// A product to schedule, as read from input.
/// Requirements are sparse: materials not listed are not used.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ProductSpec {
    pub id: String,
    pub due: f64,
    #[serde(default)]
    pub processing_time: f64,
    #[serde(default)]
    pub requirements: HashMap<String, u64>,
}

/// The expedited replenishment path of a material.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Expedite {
    pub lead_time: f64,
    pub capacity: f64,
}

/// A raw material, as read from input.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MaterialSpec {
    pub id: String,
    pub inventory: f64,
    pub lead_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expedite: Option<Expedite>,
}

/// An unvalidated instance of the scheduling problem.
/// `lines` present selects the line-sequencing variant.
#[non_exhaustive]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Instance {
    pub products: Vec<ProductSpec>,
    pub materials: Vec<MaterialSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub big_m: Option<f64>,
}

impl Instance {
    /// Creates a single-stage instance.
    #[must_use]
    pub const fn new(products: Vec<ProductSpec>, materials: Vec<MaterialSpec>) -> Self {
        Self {
            products,
            materials,
            lines: None,
            big_m: None,
        }
    }

    /// Turns the instance into the line-sequencing variant with the given number of lines.
    #[must_use]
    pub const fn with_lines(mut self, lines: usize) -> Self {
        self.lines = Some(lines);
        self
    }

    /// Uses an explicit big M instead of the derived one.
    #[must_use]
    pub const fn with_big_m(mut self, big_m: f64) -> Self {
        self.big_m = Some(big_m);
        self
    }

    /// Validates the instance and fills in every default, producing a dense problem.
    ///
    /// # Errors
    /// - If any field is negative or not finite.
    /// - If ids are duplicated or a requirement names an unknown material.
    /// - If an expedite channel is slower than the standard one.
    /// - If the line count is zero or exceeds the product count.
    /// - If an explicit big M does not exceed the planning horizon.
    pub fn validate(&self) -> Result<Problem, ValidationError> {
        if self.products.is_empty() {
            return Err(ValidationError::NoProducts);
        }
        if self.materials.is_empty() {
            return Err(ValidationError::NoMaterials);
        }

        let mut index = HashMap::with_capacity(self.materials.len());
        let mut materials = Vec::with_capacity(self.materials.len());
        for (m, spec) in self.materials.iter().enumerate() {
            if index.insert(spec.id.as_str(), m).is_some() {
                return Err(ValidationError::DuplicateMaterial(spec.id.clone()));
            }
            materials.push(Material::try_from(spec)?);
        }

        let mut seen = HashSet::with_capacity(self.products.len());
        let mut products = Vec::with_capacity(self.products.len());
        for spec in &self.products {
            if !seen.insert(spec.id.as_str()) {
                return Err(ValidationError::DuplicateProduct(spec.id.clone()));
            }
            check(&spec.id, "due date", spec.due)?;
            check(&spec.id, "processing time", spec.processing_time)?;

            let mut requirements = vec![0; materials.len()];
            for (material, &quantity) in &spec.requirements {
                let Some(&m) = index.get(material.as_str()) else {
                    return Err(ValidationError::UnknownMaterial {
                        product: spec.id.clone(),
                        material: material.clone(),
                    });
                };
                requirements[m] = quantity;
            }

            products.push(Product {
                id: spec.id.clone(),
                due: spec.due,
                processing_time: spec.processing_time,
                requirements,
            });
        }

        if let Some(lines) = self.lines {
            if lines == 0 {
                return Err(ValidationError::NoLines);
            }
            if lines > products.len() {
                let products = products.len();
                return Err(ValidationError::TooManyLines { lines, products });
            }
        }

        let horizon = horizon(&products, &materials);
        let big_m = match self.big_m {
            Some(big_m) if big_m.is_finite() && big_m > horizon => big_m,
            Some(big_m) => return Err(ValidationError::BigMTooSmall { big_m, horizon }),
            None => horizon + 1.0,
        };

        Ok(Problem {
            products,
            materials,
            lines: self.lines,
            horizon,
            big_m,
        })
    }
}

fn check(id: &str, field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        let id = id.into();
        Err(ValidationError::Negative { field, id, value })
    }
}

/// Latest completion any left-shifted schedule needs: every gate opens by the
/// longest lead time, after which jobs run back to back.
fn horizon(products: &[Product], materials: &[Material]) -> f64 {
    let lead = materials
        .iter()
        .flat_map(|m| Channel::ALL.map(|c| m.channel(c).lead_time))
        .fold(0.0, f64::max);
    lead + products.iter().map(|p| p.processing_time).sum::<f64>()
}

/// A validated product. `requirements[m]` is the quantity of material `m` per job.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    pub id: String,
    pub due: f64,
    pub processing_time: f64,
    pub requirements: Vec<u64>,
}

/// A validated material. An absent expedite path is stored as `(0, 0)`.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub id: String,
    pub inventory: f64,
    pub lead_time: f64,
    pub expedite: Expedite,
}

/// Lead time and capacity of one channel of a material.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelSpec {
    pub lead_time: f64,
    pub capacity: f64,
}

impl ChannelSpec {
    /// A channel with zero lead time can never gate a start.
    #[must_use]
    pub fn gates(&self) -> bool {
        self.lead_time > 0.0
    }
}

impl Material {
    /// Returns the lead time and capacity of a channel.
    /// The expedite pool holds the on-hand inventory plus the expedited quantity.
    #[must_use]
    pub fn channel(&self, channel: Channel) -> ChannelSpec {
        match channel {
            Channel::Standard => ChannelSpec {
                lead_time: self.lead_time,
                capacity: self.inventory,
            },
            Channel::Expedite => ChannelSpec {
                lead_time: self.expedite.lead_time,
                capacity: self.inventory + self.expedite.capacity,
            },
        }
    }
}

impl TryFrom<&MaterialSpec> for Material {
    type Error = ValidationError;

    fn try_from(spec: &MaterialSpec) -> Result<Self, Self::Error> {
        check(&spec.id, "inventory", spec.inventory)?;
        check(&spec.id, "lead time", spec.lead_time)?;

        let expedite = spec.expedite.unwrap_or_default();
        check(&spec.id, "expedite lead time", expedite.lead_time)?;
        check(&spec.id, "expedite capacity", expedite.capacity)?;
        if expedite.lead_time > spec.lead_time {
            return Err(ValidationError::ExpediteSlower {
                material: spec.id.clone(),
                expedite: expedite.lead_time,
                standard: spec.lead_time,
            });
        }

        Ok(Self {
            id: spec.id.clone(),
            inventory: spec.inventory,
            lead_time: spec.lead_time,
            expedite,
        })
    }
}

/// A validated, dense and immutable problem. Built once by [`Instance::validate`].
#[derive(Clone, Debug, PartialEq)]
pub struct Problem {
    products: Vec<Product>,
    materials: Vec<Material>,
    lines: Option<usize>,
    horizon: f64,
    big_m: f64,
}

impl Problem {
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    #[must_use]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Returns the number of production lines in the sequencing variant.
    #[must_use]
    pub const fn lines(&self) -> Option<usize> {
        self.lines
    }

    /// Returns the latest completion time a left-shifted schedule needs.
    #[must_use]
    pub const fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Returns the constant used by every big-M row. Always exceeds the horizon.
    #[must_use]
    pub const fn big_m(&self) -> f64 {
        self.big_m
    }

    /// Returns the requirement of product `p` for material `m`.
    #[must_use]
    pub fn requirement(&self, p: usize, m: usize) -> u64 {
        self.products[p].requirements[m]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn product(id: &str, due: f64, requirements: &[(&str, u64)]) -> ProductSpec {
        ProductSpec {
            id: id.into(),
            due,
            processing_time: 0.0,
            requirements: requirements.iter().map(|&(m, q)| (m.into(), q)).collect(),
        }
    }

    fn material(id: &str, inventory: f64, lead_time: f64) -> MaterialSpec {
        MaterialSpec {
            id: id.into(),
            inventory,
            lead_time,
            expedite: None,
        }
    }

    #[test]
    fn fills_missing_requirements_with_zero() -> anyhow::Result<()> {
        let instance = Instance::new(
            vec![product("P1", 3.0, &[("R2", 4)]), product("P2", 1.0, &[])],
            vec![material("R1", 0.0, 5.0), material("R2", 10.0, 7.0)],
        );

        let problem = instance.validate()?;

        assert_eq!(problem.products()[0].requirements, vec![0, 4]);
        assert_eq!(problem.products()[1].requirements, vec![0, 0]);
        assert_eq!(problem.materials()[0].expedite, Expedite::default());
        Ok(())
    }

    #[test]
    fn derives_big_m_from_horizon() -> anyhow::Result<()> {
        let mut instance = Instance::new(
            vec![product("P1", 3.0, &[]), product("P2", 1.0, &[])],
            vec![material("R1", 0.0, 5.0)],
        );
        instance.products[0].processing_time = 2.0;
        instance.products[1].processing_time = 4.0;

        let problem = instance.validate()?;

        assert!((problem.horizon() - 11.0).abs() < f64::EPSILON);
        assert!((problem.big_m() - 12.0).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn rejects_undersized_big_m() {
        let instance = Instance::new(vec![product("P1", 3.0, &[])], vec![material("R1", 0.0, 5.0)])
            .with_big_m(5.0);

        assert_eq!(
            instance.validate(),
            Err(ValidationError::BigMTooSmall {
                big_m: 5.0,
                horizon: 5.0
            })
        );
    }

    #[test]
    fn rejects_malformed_instances() {
        let materials = vec![material("R1", 0.0, 5.0)];

        let negative = Instance::new(vec![product("P1", -1.0, &[])], materials.clone());
        assert!(matches!(
            negative.validate(),
            Err(ValidationError::Negative { field: "due date", .. })
        ));

        let unknown = Instance::new(vec![product("P1", 1.0, &[("R9", 1)])], materials.clone());
        assert!(matches!(
            unknown.validate(),
            Err(ValidationError::UnknownMaterial { .. })
        ));

        let duplicate = Instance::new(
            vec![product("P1", 1.0, &[]), product("P1", 2.0, &[])],
            materials.clone(),
        );
        assert_eq!(
            duplicate.validate(),
            Err(ValidationError::DuplicateProduct("P1".into()))
        );

        let lines = Instance::new(vec![product("P1", 1.0, &[])], materials.clone()).with_lines(2);
        assert_eq!(
            lines.validate(),
            Err(ValidationError::TooManyLines {
                lines: 2,
                products: 1
            })
        );

        let mut slow = material("R1", 0.0, 5.0);
        slow.expedite = Some(Expedite {
            lead_time: 6.0,
            capacity: 1.0,
        });
        let slow = Instance::new(vec![product("P1", 1.0, &[])], vec![slow]);
        assert!(matches!(
            slow.validate(),
            Err(ValidationError::ExpediteSlower { .. })
        ));

        assert_eq!(
            Instance::new(Vec::new(), materials).validate(),
            Err(ValidationError::NoProducts)
        );
    }

    #[test]
    fn expedite_pool_adds_inventory() {
        let material = Material {
            id: "R1".into(),
            inventory: 10.0,
            lead_time: 20.0,
            expedite: Expedite {
                lead_time: 3.0,
                capacity: 25.0,
            },
        };

        let standard = material.channel(Channel::Standard);
        let expedite = material.channel(Channel::Expedite);

        assert!((standard.capacity - 10.0).abs() < f64::EPSILON);
        assert!((expedite.capacity - 35.0).abs() < f64::EPSILON);
        assert!((expedite.lead_time - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn instance_should_deserialize() -> anyhow::Result<()> {
        let json = r#"{
            "products": [{"id": "P1", "due": 3, "requirements": {"R1": 10}}],
            "materials": [{"id": "R1", "inventory": 0, "lead_time": 5,
                           "expedite": {"lead_time": 2, "capacity": 30}}],
            "lines": 1
        }"#;

        let instance: Instance = serde_json::from_str(json)?;
        let problem = instance.validate()?;

        assert_eq!(problem.lines(), Some(1));
        assert_eq!(problem.requirement(0, 0), 10);
        assert!((problem.products()[0].processing_time).abs() < f64::EPSILON);
        Ok(())
    }
}
