use std::collections::{btree_map, BTreeMap, BTreeSet, HashMap};

use crate::{navigation::StochasticModel, prelude::SV, variable::Variable};

/// Design matrix coefficient attached to a [Variable].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficient {
    /// Value used when forced, or when no partial applies
    pub default: f64,
    /// Always use the default value, never the data
    pub forced: bool,
}

impl Default for Coefficient {
    fn default() -> Self {
        Self {
            default: 1.0,
            forced: false,
        }
    }
}

impl Coefficient {
    /// [Coefficient] that always applies `value`
    pub fn forced(value: f64) -> Self {
        Self {
            default: value,
            forced: true,
        }
    }
}

/// Mutable attributes of one unknown.
/// They never take part in the [Variable] identity,
/// so updating them cannot invalidate any container order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableAttributes {
    /// [StochasticModel] driving the time update
    pub model: StochasticModel,
    /// Variance assigned when this unknown enters the system
    pub initial_variance: f64,
    /// Design matrix [Coefficient]
    pub coefficient: Coefficient,
}

/// Column indexes of one [Variable] in the current
/// and previous epoch (if it existed back then).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex<'a> {
    pub variable: &'a Variable,
    pub now: usize,
    pub pre: Option<usize>,
}

/// Ordered set of unknowns of one epoch. Traversal order is the
/// canonical [Variable] order and defines the matrix columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableSet {
    inner: BTreeMap<Variable, VariableAttributes>,
}

impl VariableSet {
    /// Inserts a new unknown. Returns false if it was already present,
    /// in which case the existing attributes are preserved.
    pub fn insert(&mut self, variable: Variable, attributes: VariableAttributes) -> bool {
        match self.inner.entry(variable) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(attributes);
                true
            },
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Number of unknowns
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn contains(&self, variable: &Variable) -> bool {
        self.inner.contains_key(variable)
    }

    /// [VariableAttributes] of said unknown
    pub fn attributes(&self, variable: &Variable) -> Option<&VariableAttributes> {
        self.inner.get(variable)
    }

    /// Mutable [VariableAttributes] of said unknown
    pub fn attributes_mut(&mut self, variable: &Variable) -> Option<&mut VariableAttributes> {
        self.inner.get_mut(variable)
    }

    /// Iterates unknowns in column order
    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &VariableAttributes)> + '_ {
        self.inner.iter()
    }

    /// Iterates [Variable]s in column order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.inner.keys()
    }

    /// Column of said [Variable]
    pub fn column(&self, variable: &Variable) -> Option<usize> {
        self.inner.keys().position(|v| v == variable)
    }

    /// Column lookup table
    pub fn columns(&self) -> HashMap<&Variable, usize> {
        self.inner
            .keys()
            .enumerate()
            .map(|(index, v)| (v, index))
            .collect()
    }

    /// Current and previous columns of each unknown, in current column order
    pub fn indices<'a>(&'a self, previous: &VariableSet) -> Vec<ColumnIndex<'a>> {
        let pre = previous.columns();

        self.inner
            .keys()
            .enumerate()
            .map(|(now, variable)| ColumnIndex {
                variable,
                now,
                pre: pre.get(variable).copied(),
            })
            .collect()
    }

    /// Number of source indexed (core) unknowns
    pub fn core_len(&self) -> usize {
        self.inner
            .keys()
            .filter(|v| !v.is_satellite_indexed())
            .count()
    }

    /// Satellites this set describes
    pub fn satellites(&self) -> BTreeSet<SV> {
        self.inner.keys().filter_map(|v| v.satellite()).collect()
    }
}

#[cfg(test)]
mod test {
    use super::{Coefficient, VariableAttributes, VariableSet};
    use crate::{
        navigation::StochasticModel,
        prelude::{Constellation, SV},
        variable::{Observable, SourceId, Variable},
    };

    fn attributes(variance: f64) -> VariableAttributes {
        VariableAttributes {
            model: StochasticModel::Constant,
            initial_variance: variance,
            coefficient: Coefficient::default(),
        }
    }

    #[test]
    fn set_columns_and_indices() {
        let source = SourceId::from("REF1");
        let (g01, g02) = (
            SV::new(Constellation::GPS, 1),
            SV::new(Constellation::GPS, 2),
        );

        let clock = Variable::source_indexed(Observable::ClockOffset, source.clone());
        let iono_01 = Variable::satellite_indexed(Observable::Ionosphere, source.clone(), g01);
        let iono_02 = Variable::satellite_indexed(Observable::Ionosphere, source.clone(), g02);

        let mut previous = VariableSet::default();
        assert!(previous.insert(iono_02.clone(), attributes(1.0)));
        assert!(previous.insert(clock.clone(), attributes(1.0)));

        let mut current = VariableSet::default();
        assert!(current.insert(iono_02.clone(), attributes(2.0)));
        assert!(current.insert(iono_01.clone(), attributes(2.0)));
        assert!(current.insert(clock.clone(), attributes(2.0)));
        assert!(!current.insert(clock.clone(), attributes(3.0)));

        assert_eq!(current.attributes(&clock).unwrap().initial_variance, 2.0);
        assert_eq!(current.core_len(), 1);
        assert_eq!(current.column(&clock), Some(0));
        assert_eq!(current.column(&iono_01), Some(1));
        assert_eq!(current.column(&iono_02), Some(2));

        let indices = current.indices(&previous);

        assert_eq!(indices.len(), 3);
        assert_eq!((indices[0].now, indices[0].pre), (0, Some(0)));
        assert_eq!((indices[1].now, indices[1].pre), (1, None));
        assert_eq!((indices[2].now, indices[2].pre), (2, Some(1)));

        assert_eq!(current.satellites().into_iter().collect::<Vec<_>>(), vec![g01, g02]);
    }
}
