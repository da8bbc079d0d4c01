use crate::core::{Channel, Problem};
use crate::model::{geq, leq, Model};
use good_lp::{Expression, Variable};

/// Gating indicator of one (product, material, channel) triple.
/// When set, the product's need is served from the channel's limited pool.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Gate {
    pub product: usize,
    pub material: usize,
    pub channel: Channel,
    pub ready: Variable,
}

/// Adds the material availability gates of every channel of every material.
///
/// For each gating pair the row `BIG_M·ready ≥ leadTime − start` forces the
/// indicator on whenever the product starts before the channel's lead time.
/// Each channel then caps the gated demand by its pool. Standard and expedite
/// channels are independent pools: a product may be gated on both.
///
/// Pairs with no requirement and channels with zero lead time never gate and
/// get no indicator.
pub fn add_gates(model: &mut Model, problem: &Problem, start: &[Variable]) -> Vec<Gate> {
    let big_m = problem.big_m();
    let mut gates = Vec::new();

    for (m, material) in problem.materials().iter().enumerate() {
        for channel in Channel::ALL {
            let spec = material.channel(channel);
            if !spec.gates() {
                continue;
            }

            let mut demand = Expression::default();
            let mut gated = false;
            for (p, &start) in start.iter().enumerate() {
                let quantity = problem.requirement(p, m);
                if quantity == 0 {
                    continue;
                }

                let ready = model.add_binary(format!("ready_{p}_{m}_{channel}"));
                model.add_constr(
                    format!("gate_{p}_{m}_{channel}"),
                    geq(big_m * ready, spec.lead_time - start),
                );

                #[allow(clippy::cast_precision_loss)]
                demand.add_mul(quantity as f64, ready);
                gated = true;
                gates.push(Gate {
                    product: p,
                    material: m,
                    channel,
                    ready,
                });
            }

            if gated {
                model.add_constr(format!("capacity_{m}_{channel}"), leq(demand, spec.capacity));
            }
        }
    }

    gates
}
