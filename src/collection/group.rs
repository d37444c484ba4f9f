use tracing::{debug, info};

use super::aggregate::{MutationCensus, RepresentativeSet};
use super::{SampleId, SampleStore, StoreError};
use crate::query::RequirementSet;
use crate::EngineConfig;

/// Handle to a group in a [`GroupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(usize);

impl GroupId {
    /// Slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Entry in a group listing: a member sample or a nested group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// Member sample.
    Sample(SampleId),
    /// Child group.
    Group(GroupId),
}

/// Ordered selection of samples. The first member is the reference.
#[derive(Debug, Clone, Default)]
pub struct Group {
    members: Vec<SampleId>,
    children: Vec<GroupId>,
    parent: Option<GroupId>,
    requirements: RequirementSet,
    custom_name: Option<String>,
    last_ordered: Option<String>,
}

impl Group {
    /// Member samples in order.
    pub fn members(&self) -> &[SampleId] {
        &self.members
    }

    /// Member count, reference included.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Child groups, newest first.
    pub fn children(&self) -> &[GroupId] {
        &self.children
    }

    /// Parent group, `None` for the root.
    pub fn parent(&self) -> Option<GroupId> {
        self.parent
    }

    /// Requirement expression the group was built from.
    pub fn requirements(&self) -> &RequirementSet {
        &self.requirements
    }

    /// Title of the last reorder.
    pub fn last_ordered(&self) -> Option<&str> {
        self.last_ordered.as_deref()
    }

    /// Name given by the user or by the operation that made the group.
    pub fn custom_name(&self) -> Option<&str> {
        self.custom_name.as_deref()
    }

    /// Override the display name.
    pub fn set_custom_name(&mut self, name: impl Into<String>) {
        self.custom_name = Some(name.into());
    }

    /// Child groups then member samples.
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.children
            .iter()
            .map(|&g| Node::Group(g))
            .chain(self.members.iter().map(|&s| Node::Sample(s)))
    }

    /// Display name: custom name or `Group requiring <reqs>`, then the
    /// member count.
    pub fn generate_text(&self) -> String {
        let mut text = match &self.custom_name {
            Some(name) => format!("{name} "),
            None if !self.requirements.is_empty() => {
                format!("Group requiring {} ", self.requirements)
            }
            None => "Group ".to_string(),
        };
        text.push_str(&format!("({})", self.members.len()));
        text
    }

    /// Requirement tokens joined with `+`, or the display name.
    pub fn short_text(&self) -> String {
        if self.requirements.is_empty() {
            self.generate_text()
        } else {
            self.requirements.short_text()
        }
    }
}

/// Slot arena of groups. Removed groups leave an empty slot so handles stay
/// stable.
#[derive(Debug, Clone)]
pub struct GroupTree {
    slots: Vec<Option<Group>>,
}

impl Default for GroupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTree {
    /// Group holding every stored sample.
    pub const ROOT: GroupId = GroupId(0);

    /// Tree with an empty root.
    pub fn new() -> Self {
        Self {
            slots: vec![Some(Group::default())],
        }
    }

    /// Group by handle.
    pub fn get(&self, id: GroupId) -> Result<&Group, StoreError> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(StoreError::UnknownGroup(id.0))
    }

    fn get_mut(&mut self, id: GroupId) -> Result<&mut Group, StoreError> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(StoreError::UnknownGroup(id.0))
    }

    /// Live group count, root included.
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Never true: the root always exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(super) fn push_sample(&mut self, id: GroupId, sample: SampleId) {
        if let Ok(group) = self.get_mut(id) {
            group.members.push(sample);
        }
    }

    fn insert(&mut self, parent: GroupId, mut group: Group) -> Result<GroupId, StoreError> {
        self.get(parent)?;
        let id = GroupId(self.slots.len());
        group.parent = Some(parent);
        self.slots.push(Some(group));
        self.get_mut(parent)?.children.insert(0, id);
        Ok(id)
    }

    /// Drop `id` and everything nested under it. Samples are untouched.
    pub fn remove(&mut self, id: GroupId) -> Result<(), StoreError> {
        if id == Self::ROOT {
            return Err(StoreError::RootGroup);
        }
        let parent = self.get(id)?.parent;
        if let Some(parent) = parent {
            self.get_mut(parent)?.children.retain(|&c| c != id);
        }

        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(group) = self.slots.get_mut(next.0).and_then(Option::take) {
                pending.extend(group.children);
            }
        }
        Ok(())
    }

    /// Depth-first listing below `id` as `(depth, node)`.
    pub fn outline(&self, id: GroupId) -> Result<Vec<(usize, Node)>, StoreError> {
        let mut out = Vec::new();
        self.walk(id, 0, &mut out)?;
        Ok(out)
    }

    fn walk(&self, id: GroupId, depth: usize, out: &mut Vec<(usize, Node)>) -> Result<(), StoreError> {
        for node in self.get(id)?.nodes() {
            out.push((depth, node));
            if let Node::Group(child) = node {
                self.walk(child, depth + 1, out)?;
            }
        }
        Ok(())
    }
}

impl SampleStore {
    fn should_process(&self, id: SampleId, requirements: &RequirementSet, config: &EngineConfig) -> bool {
        let sample = self.sample(id);
        if config.exclude_problematic && sample.is_problematic() {
            return false;
        }
        requirements.matches(sample)
    }

    /// New child of `parent` holding its reference plus every other member
    /// that satisfies `expression` (problematic samples excluded when
    /// configured).
    pub fn requirement_group(
        &mut self,
        parent: GroupId,
        expression: &str,
        config: &EngineConfig,
    ) -> Result<GroupId, StoreError> {
        let source = self.groups.get(parent)?;
        if source.len() <= 1 {
            return Err(StoreError::EmptyGroup);
        }

        let requirements = RequirementSet::parse(expression);
        let mut members = vec![source.members[0]];
        members.extend(
            source.members[1..]
                .iter()
                .copied()
                .filter(|&id| self.should_process(id, &requirements, config)),
        );
        debug!(expression, kept = members.len() - 1, "built requirement group");

        self.groups.insert(
            parent,
            Group {
                members,
                requirements,
                ..Group::default()
            },
        )
    }

    /// Top-level group of every stored sample not in `id`, reference first.
    pub fn select_inverse(&mut self, id: GroupId) -> Result<GroupId, StoreError> {
        let group = self.groups.get(id)?;
        let reference = *group.members.first().ok_or(StoreError::EmptyGroup)?;
        let name = format!("Not {}", group.generate_text());

        let mut members = vec![reference];
        members.extend(
            (1..self.len())
                .map(SampleId)
                .filter(|s| !group.members.contains(s)),
        );

        self.groups.insert(
            GroupTree::ROOT,
            Group {
                members,
                custom_name: Some(name),
                ..Group::default()
            },
        )
    }

    /// Sort the non-reference members of `id` by the metadata column
    /// `title` (string order, stable). Each member caches its value.
    pub fn reorder_group(&mut self, id: GroupId, title: &str) -> Result<(), StoreError> {
        if !self.has_title(title) {
            return Err(StoreError::UnknownTitle(title.to_string()));
        }
        let group = self.groups.get(id)?;
        if group.is_empty() {
            return Err(StoreError::EmptyGroup);
        }

        let mut keyed: Vec<(String, SampleId)> = group.members[1..]
            .iter()
            .map(|&s| (self.value_for(s, title).to_string(), s))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        for (value, sample) in &keyed {
            self.sample_mut(*sample).set_last_value(Some(value.clone()));
        }

        let group = self.groups.get_mut(id)?;
        group.members.truncate(1);
        group.members.extend(keyed.into_iter().map(|(_, s)| s));
        group.last_ordered = Some(title.to_string());
        Ok(())
    }

    /// Cut `id` into consecutive bins, each a child group that keeps the
    /// reference first. An empty `title` reuses the last ordering title;
    /// `bins == 0` means one bin per thousand members.
    pub fn split(
        &mut self,
        id: GroupId,
        title: &str,
        bins: usize,
        reorder: bool,
    ) -> Result<Vec<GroupId>, StoreError> {
        let group = self.groups.get(id)?;
        let title = if title.is_empty() {
            group.last_ordered.clone().unwrap_or_default()
        } else {
            title.to_string()
        };
        if !self.has_title(&title) {
            return Err(StoreError::UnknownTitle(title));
        }
        let bins = if bins == 0 { group.len() / 1000 + 1 } else { bins };

        if reorder {
            self.reorder_group(id, &title)?;
        }

        let group = self.groups.get(id)?;
        let members = group.members.clone();
        let reference = *members.first().ok_or(StoreError::EmptyGroup)?;
        let name = format!("Binned: {}", group.generate_text());
        let in_each = members.len() / bins + 1;

        let mut created = Vec::new();
        for chunk in members.chunks(in_each) {
            let mut bin = vec![reference];
            bin.extend(chunk.iter().copied().filter(|&s| s != reference));
            created.push(self.groups.insert(
                id,
                Group {
                    members: bin,
                    custom_name: Some(name.clone()),
                    ..Group::default()
                },
            )?);
        }

        info!(bins = created.len(), in_each, %title, "split group");
        Ok(created)
    }

    /// Remove a group and its descendants.
    pub fn remove_group(&mut self, id: GroupId) -> Result<(), StoreError> {
        self.groups.remove(id)
    }

    /// Rename a group.
    pub fn rename_group(&mut self, id: GroupId, name: &str) -> Result<(), StoreError> {
        self.groups.get_mut(id)?.set_custom_name(name);
        Ok(())
    }

    /// Mutation census over the non-reference members of `id`.
    pub fn census(&self, id: GroupId, config: &EngineConfig) -> Result<MutationCensus, StoreError> {
        let group = self.groups.get(id)?;
        let samples = group
            .members
            .iter()
            .map(|&s| self.sample(s))
            .filter(|s| !s.is_reference())
            .filter(|s| !(config.exclude_problematic && s.is_problematic()));
        Ok(MutationCensus::count(samples))
    }

    /// Representative mutation set of `id`.
    pub fn describe(&self, id: GroupId, config: &EngineConfig) -> Result<RepresentativeSet, StoreError> {
        Ok(self.census(id, config)?.representative_set())
    }

    /// Smallest and largest numeric value of the group's last ordering
    /// title. Blank and non-numeric values are ignored.
    pub fn title_limits(&self, id: GroupId) -> Result<Option<(f64, f64)>, StoreError> {
        let group = self.groups.get(id)?;
        let Some(title) = group.last_ordered.as_deref() else {
            return Ok(None);
        };
        let limits = group
            .members
            .iter()
            .filter_map(|&s| self.value_for(s, title).parse::<f64>().ok())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            });
        Ok(limits)
    }

    /// Members whose last-ordering value lies in `[min, max)`.
    pub fn number_between(&self, id: GroupId, min: f64, max: f64) -> Result<usize, StoreError> {
        let group = self.groups.get(id)?;
        let Some(title) = group.last_ordered.as_deref() else {
            return Ok(0);
        };
        Ok(group
            .members
            .iter()
            .filter_map(|&s| self.value_for(s, title).parse::<f64>().ok())
            .filter(|v| *v >= min && *v < max)
            .count())
    }
}
