//! # Bill of Materials Calculations
//!
//! Pure functions over BOM structures: how many finished units could be
//! produced from current component inventory, and what an assembly of a
//! given size would consume and cost.
//!
//! ## Virtual Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Gift Basket BOM: 2 × Candle, 1 × Basket                                │
//! │                                                                         │
//! │  Candle stock: 7   → producible = floor(7 / 2) = 3                     │
//! │  Basket stock: 2   → producible = floor(2 / 1) = 2  ← limiting         │
//! │                                                                         │
//! │  virtual_stock = min(3, 2) = 2                                          │
//! │                                                                         │
//! │  This is the ceiling on assembly-on-demand sales beyond on-hand        │
//! │  finished stock. It is recomputed from fresh reads on every use:       │
//! │  component stock changes continuously, so caching would lie.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Defensive Rules
//! A malformed BOM (any `quantity_per_unit ≤ 0`), a missing component, or a
//! component with no stock all yield zero producible units. Blocking
//! production beats dividing by zero or promising unbounded output.

use std::collections::HashMap;

use crate::money::Money;
use crate::types::Product;

// =============================================================================
// Virtual Stock
// =============================================================================

/// Computes how many units of `product` could be assembled on demand from
/// current component inventory.
///
/// Returns 0 when the product has no BOM, when any BOM line is malformed
/// (`quantity_per_unit ≤ 0`), when a component is absent from `components`,
/// or when any component has no positive stock. Otherwise returns
/// `min(floor(component_stock / quantity_per_unit))` across all BOM lines.
///
/// ## Example
/// ```rust
/// # use std::collections::HashMap;
/// # use chrono::Utc;
/// use stockbook_core::bom::virtual_stock;
/// use stockbook_core::types::{BomLine, Product, ProductKind};
///
/// # fn product(id: &str, stock: i64, bom: Vec<BomLine>) -> Product {
/// #     Product {
/// #         id: id.to_string(), owner_id: "o".to_string(), sku: None,
/// #         name: id.to_string(), kind: ProductKind::Finished,
/// #         current_stock: stock, min_stock: 0, max_stock: 100,
/// #         cost_price_cents: 100, sale_price_cents: 200, supplier_id: None,
/// #         bom, created_at: Utc::now(), updated_at: Utc::now(),
/// #     }
/// # }
/// let basket = product(
///     "basket",
///     0,
///     vec![BomLine { component_product_id: "candle".to_string(), quantity_per_unit: 2 }],
/// );
/// let mut components = HashMap::new();
/// components.insert("candle".to_string(), product("candle", 7, vec![]));
///
/// assert_eq!(virtual_stock(&basket, &components), 3);
/// ```
pub fn virtual_stock(product: &Product, components: &HashMap<String, Product>) -> i64 {
    if product.bom.is_empty() {
        return 0;
    }

    let mut producible = i64::MAX;
    for line in &product.bom {
        // Malformed BOM blocks production rather than dividing by zero.
        if line.quantity_per_unit <= 0 {
            return 0;
        }

        let stock = match components.get(&line.component_product_id) {
            Some(component) => component.current_stock,
            None => return 0,
        };
        if stock <= 0 {
            return 0;
        }

        producible = producible.min(stock / line.quantity_per_unit);
    }

    producible.max(0)
}

// =============================================================================
// Assembly Requirements
// =============================================================================

/// Units of one component needed for a planned assembly or shortfall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRequirement {
    /// Product id of the component to consume.
    pub component_product_id: String,
    /// Total units required.
    pub required: i64,
}

/// Computes per-component consumption for producing `quantity` units of
/// `product`.
///
/// Pure arithmetic over the BOM; callers validate the BOM shape and check
/// each requirement against available component stock before committing.
pub fn assembly_requirements(product: &Product, quantity: i64) -> Vec<ComponentRequirement> {
    product
        .bom
        .iter()
        .map(|line| ComponentRequirement {
            component_product_id: line.component_product_id.clone(),
            required: line.quantity_per_unit * quantity,
        })
        .collect()
}

/// Computes the cost of assembling ONE unit of `product` from components:
/// `Σ(component cost × quantity_per_unit)`.
///
/// Components missing from the lookup contribute nothing; callers that need
/// strict existence guarantees check before calling.
pub fn assembled_unit_cost(product: &Product, components: &HashMap<String, Product>) -> Money {
    let mut cost = Money::zero();
    for line in &product.bom {
        if let Some(component) = components.get(&line.component_product_id) {
            cost += component.cost_price().multiply_quantity(line.quantity_per_unit);
        }
    }
    cost
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BomLine, ProductKind};
    use chrono::Utc;
    use proptest::prelude::*;

    fn product(id: &str, stock: i64, cost_cents: i64, bom: Vec<BomLine>) -> Product {
        Product {
            id: id.to_string(),
            owner_id: "owner-1".to_string(),
            sku: None,
            name: id.to_string(),
            kind: if bom.is_empty() {
                ProductKind::Component
            } else {
                ProductKind::Finished
            },
            current_stock: stock,
            min_stock: 0,
            max_stock: 1_000,
            cost_price_cents: cost_cents,
            sale_price_cents: cost_cents * 2,
            supplier_id: None,
            bom,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn line(component: &str, per_unit: i64) -> BomLine {
        BomLine {
            component_product_id: component.to_string(),
            quantity_per_unit: per_unit,
        }
    }

    fn lookup(products: Vec<Product>) -> HashMap<String, Product> {
        products.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    #[test]
    fn test_empty_bom_yields_zero() {
        let plain = product("plain", 50, 100, vec![]);
        assert_eq!(virtual_stock(&plain, &HashMap::new()), 0);
    }

    #[test]
    fn test_single_component_floors() {
        let basket = product("basket", 0, 0, vec![line("candle", 2)]);
        let components = lookup(vec![product("candle", 7, 150, vec![])]);
        assert_eq!(virtual_stock(&basket, &components), 3);
    }

    #[test]
    fn test_minimum_across_components() {
        let basket = product("basket", 0, 0, vec![line("candle", 2), line("box", 1)]);
        let components = lookup(vec![
            product("candle", 7, 150, vec![]),
            product("box", 2, 50, vec![]),
        ]);
        // Candles allow 3, boxes allow 2: boxes limit production.
        assert_eq!(virtual_stock(&basket, &components), 2);
    }

    #[test]
    fn test_missing_component_yields_zero() {
        let basket = product("basket", 0, 0, vec![line("candle", 2), line("ghost", 1)]);
        let components = lookup(vec![product("candle", 7, 150, vec![])]);
        assert_eq!(virtual_stock(&basket, &components), 0);
    }

    #[test]
    fn test_malformed_quantity_yields_zero() {
        let zero_qty = product("basket", 0, 0, vec![line("candle", 0)]);
        let negative_qty = product("crate", 0, 0, vec![line("candle", -3)]);
        let components = lookup(vec![product("candle", 100, 150, vec![])]);

        assert_eq!(virtual_stock(&zero_qty, &components), 0);
        assert_eq!(virtual_stock(&negative_qty, &components), 0);
    }

    #[test]
    fn test_exhausted_component_yields_zero() {
        let basket = product("basket", 0, 0, vec![line("candle", 2)]);
        let empty = lookup(vec![product("candle", 0, 150, vec![])]);
        let negative = lookup(vec![product("candle", -4, 150, vec![])]);

        assert_eq!(virtual_stock(&basket, &empty), 0);
        assert_eq!(virtual_stock(&basket, &negative), 0);
    }

    #[test]
    fn test_assembly_requirements() {
        let basket = product("basket", 0, 0, vec![line("candle", 2), line("box", 1)]);
        let requirements = assembly_requirements(&basket, 3);
        assert_eq!(
            requirements,
            vec![
                ComponentRequirement {
                    component_product_id: "candle".to_string(),
                    required: 6,
                },
                ComponentRequirement {
                    component_product_id: "box".to_string(),
                    required: 3,
                },
            ]
        );
    }

    #[test]
    fn test_assembled_unit_cost_sums_component_costs() {
        let basket = product("basket", 0, 0, vec![line("candle", 2), line("box", 1)]);
        let components = lookup(vec![
            product("candle", 7, 150, vec![]),
            product("box", 2, 50, vec![]),
        ]);
        // 2 × $1.50 + 1 × $0.50 = $3.50
        assert_eq!(assembled_unit_cost(&basket, &components).cents(), 350);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: for any well-formed BOM, virtual stock equals the
        /// minimum per-component floor and therefore never exceeds any
        /// single component's ceiling.
        #[test]
        fn virtual_stock_matches_component_ceilings(
            lines in prop::collection::vec((0i64..500, 1i64..10), 1..6)
        ) {
            let bom: Vec<BomLine> = lines
                .iter()
                .enumerate()
                .map(|(i, (_, per_unit))| line(&format!("c-{i}"), *per_unit))
                .collect();
            let components = lookup(
                lines
                    .iter()
                    .enumerate()
                    .map(|(i, (stock, _))| product(&format!("c-{i}"), *stock, 100, vec![]))
                    .collect(),
            );
            let finished = product("finished", 0, 0, bom);

            let expected = lines
                .iter()
                .map(|(stock, per_unit)| stock / per_unit)
                .min()
                .unwrap_or(0);

            let result = virtual_stock(&finished, &components);
            prop_assert_eq!(result, expected);
            for (stock, per_unit) in &lines {
                prop_assert!(result <= stock / per_unit);
            }
        }
    }
}
