use std::fmt;

use tracing::{debug, warn};

use crate::catalog::{JoinCatalog, JoinName};

/// Joins activated for one build, in activation order.
#[derive(Debug, Default)]
pub(crate) struct ActiveJoins {
    active: Vec<JoinName>,
}

impl ActiveJoins {
    pub(crate) fn contains(&self, name: JoinName) -> bool {
        self.active.contains(&name)
    }

    pub(crate) fn names(&self) -> &[JoinName] {
        &self.active
    }

    /// Activate `name` after its prerequisites, depth first. Already active
    /// joins are left alone.
    pub(crate) fn require(&mut self, catalog: &JoinCatalog, name: JoinName) {
        let mut visiting = Vec::new();
        self.require_inner(catalog, name, &mut visiting);
    }

    fn require_inner(
        &mut self,
        catalog: &JoinCatalog,
        name: JoinName,
        visiting: &mut Vec<JoinName>,
    ) {
        if self.contains(name) || visiting.contains(&name) {
            return;
        }
        let Some(spec) = catalog.get(name) else {
            warn!(join = %name, "join missing from catalog; skipped");
            return;
        };
        visiting.push(name);
        for dep in spec.requires {
            self.require_inner(catalog, *dep, visiting);
        }
        visiting.pop();
        debug!(join = %name, alias = spec.alias, "activated join");
        self.active.push(name);
    }

    /// Back a table alias with a join: no-op for the base alias or an alias
    /// some active join already provides, otherwise the first catalog entry
    /// with that alias is activated.
    pub(crate) fn require_alias(&mut self, catalog: &JoinCatalog, base_alias: &str, alias: &str) {
        if alias == base_alias {
            return;
        }
        let provided = self
            .active
            .iter()
            .filter_map(|name| catalog.get(*name))
            .any(|spec| spec.alias == alias);
        if provided {
            return;
        }
        match catalog.join_for_alias(alias) {
            Some(name) => self.require(catalog, name),
            None => debug!(alias, "alias not in join catalog; left to the store"),
        }
    }

    /// Active joins in dependency order.
    pub(crate) fn ordered(&self, catalog: &JoinCatalog) -> Vec<JoinName> {
        resolve_order(&self.active, |name| {
            catalog.get(name).map(|spec| spec.requires).unwrap_or(&[])
        })
    }
}

/// Layered topological order over `items`.
///
/// Each round emits, in input order, every item whose prerequisites were all
/// emitted in earlier rounds. A prerequisite outside `items` is never
/// satisfied. When a round finds nothing ready the first remaining item is
/// emitted anyway so the walk always terminates.
pub(crate) fn resolve_order<'a, K, F>(items: &[K], prerequisites: F) -> Vec<K>
where
    K: Copy + PartialEq + fmt::Display + 'a,
    F: Fn(K) -> &'a [K],
{
    let mut remaining: Vec<K> = Vec::with_capacity(items.len());
    for item in items {
        if !remaining.contains(item) {
            remaining.push(*item);
        }
    }
    let mut ordered: Vec<K> = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let ready: Vec<K> = remaining
            .iter()
            .copied()
            .filter(|item| prerequisites(*item).iter().all(|dep| ordered.contains(dep)))
            .collect();

        if ready.is_empty() {
            let forced = remaining.remove(0);
            warn!(
                join = %forced,
                remaining = remaining.len(),
                "join prerequisites unsatisfiable; emitting in activation order"
            );
            ordered.push(forced);
            continue;
        }

        remaining.retain(|item| !ready.contains(item));
        ordered.extend(ready);
    }
    ordered
}
