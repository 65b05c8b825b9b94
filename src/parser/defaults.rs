// 🧩 Defaults Resolver - fill unset parameters with movement-kind defaults

use crate::movement::{GlobalParameters, MovementKind, ParamKey};

pub struct DefaultsResolver;

impl DefaultsResolver {
    /// Drop the location key the kind ignores, then fill only unset keys
    /// (blank counts as unset). Returns the keys that were defaulted.
    pub fn resolve(kind: MovementKind, parameters: &mut GlobalParameters) -> Vec<ParamKey> {
        if let Some(key) = kind.ignored_param() {
            parameters.remove(key);
        }

        let mut filled = Vec::new();

        for (key, value) in kind.defaults() {
            if !parameters.is_set(*key) {
                parameters.insert(*key, *value);
                filled.push(*key);
            }
        }

        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::{EXTERNAL, NOT_DESCRIBED};

    #[test]
    fn test_in_defaults() {
        let mut params = GlobalParameters::new();
        let filled = DefaultsResolver::resolve(MovementKind::In, &mut params);

        assert_eq!(filled, vec![ParamKey::Project, ParamKey::Driver, ParamKey::From]);
        assert_eq!(params.get(ParamKey::From), Some(NOT_DESCRIBED));
        assert_eq!(params.get(ParamKey::To), None);
    }

    #[test]
    fn test_out_defaults_keep_explicit_values() {
        let mut params = GlobalParameters::new();
        params.insert(ParamKey::Project, "Mzuzu");
        DefaultsResolver::resolve(MovementKind::Out, &mut params);

        assert_eq!(params.get(ParamKey::Project), Some("Mzuzu"));
        assert_eq!(params.get(ParamKey::Driver), Some(NOT_DESCRIBED));
        assert_eq!(params.get(ParamKey::To), Some(EXTERNAL));
    }

    #[test]
    fn test_inapplicable_location_dropped() {
        let mut params = GlobalParameters::new();
        params.insert(ParamKey::To, "Site A");
        params.insert(ParamKey::From, "Supplier");
        DefaultsResolver::resolve(MovementKind::In, &mut params);
        assert_eq!(params.get(ParamKey::To), None);
        assert_eq!(params.get(ParamKey::From), Some("Supplier"));

        let mut params = GlobalParameters::new();
        params.insert(ParamKey::From, "Supplier");
        DefaultsResolver::resolve(MovementKind::Out, &mut params);
        assert_eq!(params.get(ParamKey::From), None);
        assert_eq!(params.get(ParamKey::To), Some(EXTERNAL));
    }

    #[test]
    fn test_adjust_keeps_both_locations() {
        let mut params = GlobalParameters::new();
        params.insert(ParamKey::To, "Site A");
        params.insert(ParamKey::From, "Store");
        DefaultsResolver::resolve(MovementKind::Adjust, &mut params);
        assert_eq!(params.get(ParamKey::To), Some("Site A"));
        assert_eq!(params.get(ParamKey::From), Some("Store"));
    }

    #[test]
    fn test_whitespace_value_is_replaced() {
        let mut params = GlobalParameters::new();
        params.insert(ParamKey::Driver, "   ");
        DefaultsResolver::resolve(MovementKind::Adjust, &mut params);

        assert_eq!(params.get(ParamKey::Driver), Some(NOT_DESCRIBED));
    }

    #[test]
    fn test_resolve_twice_is_stable() {
        let mut params = GlobalParameters::new();
        DefaultsResolver::resolve(MovementKind::In, &mut params);
        let snapshot = params.clone();
        let filled = DefaultsResolver::resolve(MovementKind::In, &mut params);

        assert!(filled.is_empty());
        assert_eq!(params, snapshot);
    }
}
