//! Recipe resolution for composable denomination codes.
//!
//! A target denomination that cannot be satisfied by a single code is built from a *recipe*: a
//! multiset of smaller denominations whose sum equals the target. Each target may have several
//! candidate recipes, tried in order, with the direct single-code recipe preferred whenever it
//! has stock. The recipe table is static configuration consumed by the engine; the inventory
//! counts it is evaluated against come from the database.

use std::collections::HashMap;

use log::*;

/// A multiset of component denominations summing to a target amount.
pub type Recipe = Vec<i64>;

/// Per-target recipe configuration.
///
/// Targets listed in `recipes` carry an ordered list of candidate recipes. Targets absent from
/// `recipes` but present in `codes_map` have exactly one fixed decomposition. Targets in neither
/// table are unconfigured and cannot be fulfilled.
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: HashMap<i64, Vec<Recipe>>,
    codes_map: HashMap<i64, Recipe>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recipe table used in production: the standard UC packs plus the combinations the shop
    /// composes from them.
    pub fn standard() -> Self {
        let mut book = Self::new();
        for direct in [60, 325, 660, 1800, 3850, 8100] {
            book.add_recipe(direct, vec![direct]);
        }
        book.add_recipe(120, vec![60, 60]);
        book.add_recipe(385, vec![325, 60]);
        book.add_recipe(720, vec![720]);
        book.add_recipe(720, vec![360, 360]);
        book.add_recipe(720, vec![660, 60]);
        book.add_recipe(985, vec![660, 325]);
        book.add_recipe(1320, vec![660, 660]);
        book.add_recipe(2125, vec![1800, 325]);
        book.set_codes_map(16200, vec![8100, 8100]);
        book
    }

    pub fn add_recipe(&mut self, target: i64, recipe: Recipe) -> &mut Self {
        self.recipes.entry(target).or_default().push(recipe);
        self
    }

    pub fn set_codes_map(&mut self, target: i64, nominals: Recipe) -> &mut Self {
        self.codes_map.insert(target, nominals);
        self
    }

    /// All distinct component denominations that could be needed for the given target.
    pub fn components_for(&self, target: i64) -> Vec<i64> {
        let mut components: Vec<i64> = match self.recipes.get(&target) {
            Some(recipes) => recipes.iter().flatten().copied().collect(),
            None => self.codes_map.get(&target).cloned().unwrap_or_default(),
        };
        components.sort_unstable();
        components.dedup();
        components
    }

    /// Selects the multiset of nominals to reserve for an order of `quantity` units of `target`.
    ///
    /// Targets without a recipe list fall back to the fixed codes map (no availability check; the
    /// claim transaction is the final arbiter). Otherwise the first recipe whose every component
    /// has at least `required x quantity` unreserved codes wins. Returns `None` when nothing is
    /// configured or no recipe is viable.
    pub fn nominals_for(&self, target: i64, quantity: i64, available: &HashMap<i64, i64>) -> Option<Recipe> {
        let recipes = match self.recipes.get(&target) {
            None => return self.codes_map.get(&target).cloned(),
            Some(recipes) => recipes,
        };
        if recipes.is_empty() {
            return None;
        }
        for recipe in recipes {
            if Self::is_viable(recipe, quantity, available) {
                debug!("🧩️ Selected recipe {recipe:?} for target {target} x{quantity}");
                return Some(recipe.clone());
            }
        }
        warn!("🧩️ No viable recipe for target {target} x{quantity}");
        None
    }

    /// How many units of `target` can be built from the available (unreserved) code counts.
    ///
    /// A direct single-code recipe takes precedence whenever it alone has stock; otherwise the
    /// best (maximum) buildable count across the multi-component recipes determines the amount.
    pub fn stock_amount(&self, target: i64, available: &HashMap<i64, i64>) -> i64 {
        let recipes = match self.recipes.get(&target) {
            None => {
                let nominals = match self.codes_map.get(&target) {
                    Some(n) if !n.is_empty() => n,
                    _ => return 0,
                };
                return Self::buildable(&counted(nominals), available);
            },
            Some(recipes) => recipes,
        };
        if recipes.is_empty() {
            return 0;
        }
        let direct = vec![target];
        if recipes.contains(&direct) {
            let direct_count = available.get(&target).copied().unwrap_or_default();
            if direct_count > 0 {
                return direct_count;
            }
        }
        recipes
            .iter()
            .filter(|recipe| **recipe != direct)
            .map(|recipe| Self::buildable(&counted(recipe), available))
            .max()
            .unwrap_or_default()
    }

    fn is_viable(recipe: &Recipe, quantity: i64, available: &HashMap<i64, i64>) -> bool {
        counted(recipe)
            .iter()
            .all(|(component, required)| available.get(component).copied().unwrap_or_default() >= required * quantity)
    }

    fn buildable(requirements: &HashMap<i64, i64>, available: &HashMap<i64, i64>) -> i64 {
        requirements
            .iter()
            .map(|(component, required)| available.get(component).copied().unwrap_or_default() / required)
            .min()
            .unwrap_or_default()
    }
}

fn counted(recipe: &Recipe) -> HashMap<i64, i64> {
    let mut counts = HashMap::new();
    for nominal in recipe {
        *counts.entry(*nominal).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod test {
    use super::*;

    fn counts(pairs: &[(i64, i64)]) -> HashMap<i64, i64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn direct_recipe_wins_when_it_has_stock() {
        let book = RecipeBook::standard();
        let available = counts(&[(720, 3), (360, 10)]);
        assert_eq!(book.stock_amount(720, &available), 3);
        assert_eq!(book.nominals_for(720, 1, &available), Some(vec![720]));
    }

    #[test]
    fn falls_back_to_component_recipe() {
        let book = RecipeBook::standard();
        let available = counts(&[(720, 0), (360, 4)]);
        assert_eq!(book.stock_amount(720, &available), 2);
        assert_eq!(book.nominals_for(720, 2, &available), Some(vec![360, 360]));
        // not enough for 3 units via 360s, and no 660+60 stock either
        assert_eq!(book.nominals_for(720, 3, &available), None);
    }

    #[test]
    fn availability_is_the_best_recipe_not_the_first() {
        let book = RecipeBook::standard();
        // 720 via 360+360 builds 1, via 660+60 builds 4
        let available = counts(&[(360, 2), (660, 4), (60, 9)]);
        assert_eq!(book.stock_amount(720, &available), 4);
    }

    #[test]
    fn buildable_quantity_is_min_over_components() {
        let book = RecipeBook::standard();
        // 985 = 660 + 325
        let available = counts(&[(660, 5), (325, 2)]);
        assert_eq!(book.stock_amount(985, &available), 2);
    }

    #[test]
    fn codes_map_targets_have_a_fixed_decomposition() {
        let book = RecipeBook::standard();
        let available = counts(&[(8100, 5)]);
        assert_eq!(book.stock_amount(16200, &available), 2);
        assert_eq!(book.nominals_for(16200, 1, &available), Some(vec![8100, 8100]));
    }

    #[test]
    fn unconfigured_targets_yield_nothing() {
        let book = RecipeBook::standard();
        assert_eq!(book.stock_amount(999, &HashMap::new()), 0);
        assert_eq!(book.nominals_for(999, 1, &HashMap::new()), None);
    }

    #[test]
    fn empty_recipe_list_is_a_configuration_error() {
        let mut book = RecipeBook::new();
        book.recipes.insert(720, vec![]);
        assert_eq!(book.nominals_for(720, 1, &HashMap::new()), None);
        assert_eq!(book.stock_amount(720, &HashMap::new()), 0);
    }
}
