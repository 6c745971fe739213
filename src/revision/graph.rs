use std::collections::{BTreeSet, HashMap, HashSet};

use crate::common::errors::RevisionError;
use crate::revision::plan::{Direction, PlannedStep};
use crate::revision::record::{Migration, Revision};
use crate::revision::target::Target;

/// Validated revision history.
///
/// A `down_revision` that names no local revision is an anchor: a predecessor
/// defined outside this set of scripts. Anchors have no parents of their own and
/// can only be reached through the ledger.
pub struct RevisionGraph {
    migrations: Vec<Box<dyn Migration>>,
    index: HashMap<&'static str, usize>,
    labels: HashMap<&'static str, usize>,
    anchors: BTreeSet<&'static str>,
    order: Vec<usize>,
}

impl RevisionGraph {
    pub fn new(migrations: Vec<Box<dyn Migration>>) -> Result<Self, RevisionError> {
        let mut index = HashMap::new();
        for (position, migration) in migrations.iter().enumerate() {
            let id = migration.revision().id;
            if index.insert(id, position).is_some() {
                return Err(RevisionError::DuplicateRevision(id.to_string()));
            }
        }

        let mut labels = HashMap::new();
        for (position, migration) in migrations.iter().enumerate() {
            for label in migration.revision().branch_labels {
                if index.contains_key(label) || labels.insert(*label, position).is_some() {
                    return Err(RevisionError::DuplicateBranchLabel(label.to_string()));
                }
            }
        }

        let mut anchors = BTreeSet::new();
        for migration in &migrations {
            let revision = migration.revision();

            for dependency in revision.depends_on {
                if !index.contains_key(dependency) && !labels.contains_key(dependency) {
                    return Err(RevisionError::UnresolvedDependency {
                        revision: revision.id.to_string(),
                        dependency: dependency.to_string(),
                    });
                }
            }

            anchors.extend(
                revision
                    .down_revision
                    .iter()
                    .filter(|parent| !index.contains_key(*parent))
                    .copied(),
            );
        }

        let mut graph = RevisionGraph {
            migrations,
            index,
            labels,
            anchors,
            order: Vec::new(),
        };
        graph.order = graph.topological_order()?;

        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn migration(&self, id: &str) -> Option<&dyn Migration> {
        self.index
            .get(id)
            .map(|position| self.migrations[*position].as_ref())
    }

    pub fn revision(&self, id: &str) -> Option<&Revision> {
        self.migration(id).map(|migration| migration.revision())
    }

    pub fn anchors(&self) -> Vec<&'static str> {
        self.anchors.iter().copied().collect()
    }

    pub fn is_anchor(&self, id: &str) -> bool {
        self.anchors.contains(id)
    }

    /// Revisions that no other revision names as a predecessor, oldest first.
    pub fn heads(&self) -> Vec<&'static str> {
        let referenced: HashSet<&str> = self
            .migrations
            .iter()
            .flat_map(|migration| migration.revision().down_revision.iter().copied())
            .collect();

        self.ordered_ids()
            .filter(|id| !referenced.contains(id))
            .collect()
    }

    /// Revisions newest first.
    pub fn history(&self) -> Vec<&Revision> {
        self.order
            .iter()
            .rev()
            .map(|position| self.migrations[*position].revision())
            .collect()
    }

    /// Resolves a revision id, an anchor, a branch label or a unique id prefix.
    pub fn resolve(&self, name: &str) -> Result<&'static str, RevisionError> {
        if let Some(id) = self.known(name) {
            return Ok(id);
        }

        if let Some(position) = self.labels.get(name) {
            return Ok(self.id_at(*position));
        }

        let mut candidates: Vec<&'static str> = self
            .index
            .keys()
            .filter(|id| id.starts_with(name))
            .copied()
            .collect();
        candidates.sort_unstable();

        match candidates.as_slice() {
            [] => Err(RevisionError::UnknownRevision(name.to_string())),
            [single] => Ok(*single),
            many => Err(RevisionError::AmbiguousRevision {
                prefix: name.to_string(),
                candidates: many.join(", "),
            }),
        }
    }

    /// Revisions a stamp to `target` writes into the ledger.
    pub fn stamp_heads(&self, target: &Target) -> Result<Vec<&'static str>, RevisionError> {
        match target {
            Target::Head => Ok(vec![self.single_head()?]),
            Target::Heads => Ok(self.heads()),
            Target::Base => Ok(Vec::new()),
            Target::Revision(name) => Ok(vec![self.resolve(name)?]),
            Target::Relative(_) => Err(RevisionError::InvalidTarget(format!(
                "{} cannot be stamped",
                target
            ))),
        }
    }

    pub fn upgrade_plan(
        &self,
        current: &[String],
        target: &Target,
    ) -> Result<Vec<PlannedStep>, RevisionError> {
        let current = self.normalize(current)?;

        let targets = match target {
            Target::Head => vec![self.single_head()?],
            Target::Heads => self.heads(),
            Target::Revision(name) => vec![self.resolve(name)?],
            Target::Relative(steps) if *steps > 0 => vec![self.step_up(&current, *steps)?],
            Target::Base | Target::Relative(_) => {
                return Err(RevisionError::InvalidTarget(format!(
                    "{} is not an upgrade target",
                    target
                )))
            }
        };

        let applied = self.ancestors_or_self(&current, true);
        let required = self.ancestors_or_self(&targets, true);

        if let Some(anchor) = required
            .iter()
            .find(|id| self.is_anchor(id) && !applied.contains(*id))
        {
            return Err(RevisionError::AnchorNotApplied(anchor.to_string()));
        }

        let mut heads: BTreeSet<&'static str> = current.iter().copied().collect();
        let mut steps = Vec::new();

        for id in self
            .ordered_ids()
            .filter(|id| required.contains(id) && !applied.contains(id))
        {
            let ancestors = self.ancestors_or_self(&[id], false);
            let removed: Vec<&'static str> = heads
                .iter()
                .filter(|head| **head != id && ancestors.contains(*head))
                .copied()
                .collect();

            for head in &removed {
                heads.remove(head);
            }
            heads.insert(id);

            steps.push(PlannedStep {
                revision: id,
                direction: Direction::Upgrade,
                removed_heads: removed.iter().map(|head| head.to_string()).collect(),
                added_heads: vec![id.to_string()],
            });
        }

        Ok(steps)
    }

    pub fn downgrade_plan(
        &self,
        current: &[String],
        target: &Target,
    ) -> Result<Vec<PlannedStep>, RevisionError> {
        let current = self.normalize(current)?;
        let applied = self.ancestors_or_self(&current, true);

        let keep = match target {
            Target::Base => BTreeSet::new(),
            Target::Revision(name) => {
                let id = self.resolve(name)?;
                if !applied.contains(id) {
                    return Err(RevisionError::NotAnAncestor(id.to_string()));
                }
                self.ancestors_or_self(&[id], true)
            }
            Target::Relative(steps) if *steps < 0 => match self.step_down(&current, *steps)? {
                Some(id) => self.ancestors_or_self(&[id], true),
                None => BTreeSet::new(),
            },
            Target::Head | Target::Heads | Target::Relative(_) => {
                return Err(RevisionError::InvalidTarget(format!(
                    "{} is not a downgrade target",
                    target
                )))
            }
        };

        let mut heads: BTreeSet<&'static str> = current.iter().copied().collect();
        let mut steps = Vec::new();

        let pending: Vec<&'static str> = self
            .ordered_ids()
            .filter(|id| applied.contains(id) && !keep.contains(id))
            .collect();

        for id in pending.into_iter().rev() {
            let removed = if heads.remove(id) {
                vec![id.to_string()]
            } else {
                Vec::new()
            };

            let covered = self.ancestors_or_self(&heads.iter().copied().collect::<Vec<_>>(), false);
            let parents = self
                .revision(id)
                .map(|revision| revision.down_revision)
                .unwrap_or_default();

            let added: Vec<&'static str> = parents
                .iter()
                .filter(|parent| !covered.contains(*parent))
                .copied()
                .collect();
            heads.extend(added.iter().copied());

            steps.push(PlannedStep {
                revision: id,
                direction: Direction::Downgrade,
                removed_heads: removed,
                added_heads: added.iter().map(|head| head.to_string()).collect(),
            });
        }

        Ok(steps)
    }

    /// Maps ledger rows onto known revisions.
    pub fn normalize(&self, current: &[String]) -> Result<Vec<&'static str>, RevisionError> {
        current
            .iter()
            .map(|id| {
                self.known(id)
                    .ok_or_else(|| RevisionError::UnknownLedgerRevision(id.clone()))
            })
            .collect()
    }

    /// Every revision reachable from `ids`, including `ids` and any anchors on the way.
    pub fn ancestors_or_self(
        &self,
        ids: &[&'static str],
        follow_dependencies: bool,
    ) -> BTreeSet<&'static str> {
        let mut seen = BTreeSet::new();
        let mut stack = ids.to_vec();

        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }

            if let Some(revision) = self.revision(id) {
                stack.extend(revision.down_revision.iter().copied());

                if follow_dependencies {
                    stack.extend(
                        revision
                            .depends_on
                            .iter()
                            .filter_map(|dependency| self.resolve_local(dependency)),
                    );
                }
            }
        }

        seen
    }

    fn known(&self, id: &str) -> Option<&'static str> {
        self.index
            .get_key_value(id)
            .map(|(key, _)| *key)
            .or_else(|| self.anchors.get(id).copied())
    }

    fn resolve_local(&self, name: &str) -> Option<&'static str> {
        self.index
            .get_key_value(name)
            .map(|(key, _)| *key)
            .or_else(|| self.labels.get(name).map(|position| self.id_at(*position)))
    }

    fn id_at(&self, position: usize) -> &'static str {
        self.migrations[position].revision().id
    }

    fn ordered_ids(&self) -> impl DoubleEndedIterator<Item = &'static str> + '_ {
        self.order.iter().map(|position| self.id_at(*position))
    }

    fn single_head(&self) -> Result<&'static str, RevisionError> {
        match self.heads().as_slice() {
            [] => Err(RevisionError::InvalidTarget(
                "no revisions are defined".to_string(),
            )),
            [head] => Ok(*head),
            many => Err(RevisionError::MultipleHeads(many.join(", "))),
        }
    }

    fn parents(&self, position: usize) -> Vec<usize> {
        let revision = self.migrations[position].revision();
        let mut parents: Vec<usize> = revision
            .down_revision
            .iter()
            .filter_map(|parent| self.index.get(parent).copied())
            .chain(
                revision
                    .depends_on
                    .iter()
                    .filter_map(|dependency| self.resolve_local(dependency))
                    .filter_map(|id| self.index.get(id).copied()),
            )
            .collect();

        parents.sort_unstable();
        parents.dedup();
        parents
    }

    // Kahn's algorithm; ties are broken by registration order.
    fn topological_order(&self) -> Result<Vec<usize>, RevisionError> {
        let count = self.migrations.len();
        let mut indegree = vec![0usize; count];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];

        for position in 0..count {
            for parent in self.parents(position) {
                indegree[position] += 1;
                children[parent].push(position);
            }
        }

        let mut ready: BTreeSet<usize> = (0..count).filter(|p| indegree[*p] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(position) = ready.pop_first() {
            order.push(position);

            for child in &children[position] {
                indegree[*child] -= 1;
                if indegree[*child] == 0 {
                    ready.insert(*child);
                }
            }
        }

        if order.len() < count {
            let mut remaining: Vec<&str> = (0..count)
                .filter(|p| indegree[*p] > 0)
                .map(|p| self.id_at(p))
                .collect();
            remaining.sort_unstable();

            return Err(RevisionError::Cycle(remaining.join(", ")));
        }

        Ok(order)
    }

    fn children_of(&self, parent: Option<&str>) -> Vec<&'static str> {
        self.order
            .iter()
            .map(|position| self.migrations[*position].revision())
            .filter(|revision| match parent {
                Some(parent) => revision.down_revision.iter().any(|id| *id == parent),
                None => revision.is_root(),
            })
            .map(|revision| revision.id)
            .collect()
    }

    fn step_up(&self, current: &[&'static str], steps: i64) -> Result<&'static str, RevisionError> {
        let mut position: Option<&'static str> = match current {
            [] => None,
            [head] => Some(*head),
            many => return Err(RevisionError::MultipleHeads(many.join(", "))),
        };

        for _ in 0..steps {
            position = match self.children_of(position).as_slice() {
                [] => return Err(RevisionError::RelativeOutOfRange(steps)),
                [child] => Some(*child),
                _ => {
                    return Err(RevisionError::AmbiguousStep(
                        position.unwrap_or("<base>").to_string(),
                    ))
                }
            };
        }

        position.ok_or(RevisionError::RelativeOutOfRange(steps))
    }

    /// Walks `steps` (negative) revisions back from the single current head.
    fn step_down(
        &self,
        current: &[&'static str],
        steps: i64,
    ) -> Result<Option<&'static str>, RevisionError> {
        let mut position = match current {
            [] => return Err(RevisionError::RelativeOutOfRange(steps)),
            [head] => Some(*head),
            many => return Err(RevisionError::MultipleHeads(many.join(", "))),
        };

        for _ in 0..steps.unsigned_abs() {
            let revision = position
                .and_then(|id| self.revision(id))
                .ok_or(RevisionError::RelativeOutOfRange(steps))?;

            position = match revision.down_revision {
                [] => None,
                [parent] => Some(*parent),
                _ => return Err(RevisionError::AmbiguousStep(revision.id.to_string())),
            };
        }

        Ok(position)
    }
}
