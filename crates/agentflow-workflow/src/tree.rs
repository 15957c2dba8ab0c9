use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use agentflow_config::{Step, StepType};

use crate::error::WorkflowError;

/// A step together with the steps that name it as their parent.
#[derive(Debug, Clone, PartialEq)]
pub struct StepNode {
  pub step: Step,
  /// Children ordered by step id.
  pub children: Vec<Arc<StepNode>>,
}

impl StepNode {
  pub fn id(&self) -> &str {
    &self.step.id
  }

  pub fn is_leaf(&self) -> bool {
    self.children.is_empty()
  }

  fn count(&self) -> usize {
    1 + self.children.iter().map(|c| c.count()).sum::<usize>()
  }

  fn depth(&self) -> usize {
    1 + self.children.iter().map(|c| c.depth()).max().unwrap_or(0)
  }
}

/// Parent id -> children lookup over a flat step list.
struct ChildIndex<'a> {
  roots: Vec<&'a Step>,
  children: HashMap<&'a str, Vec<&'a Step>>,
}

impl<'a> ChildIndex<'a> {
  fn new(steps: &'a [Step]) -> Self {
    let mut roots = Vec::new();
    let mut children: HashMap<&'a str, Vec<&'a Step>> = HashMap::new();

    for step in steps {
      match step.parent_id.as_deref() {
        None => roots.push(step),
        Some(parent) => children.entry(parent).or_default().push(step),
      }
    }

    // Sorting makes the tree independent of input order
    roots.sort_by(|a, b| a.id.cmp(&b.id));
    for siblings in children.values_mut() {
      siblings.sort_by(|a, b| a.id.cmp(&b.id));
    }

    Self { roots, children }
  }

  fn single_root(&self) -> Result<&'a Step, WorkflowError> {
    match self.roots.as_slice() {
      [] => Err(WorkflowError::NoRoot),
      [root] => Ok(*root),
      roots => Err(WorkflowError::MultipleRoots {
        step_ids: roots.iter().map(|s| s.id.clone()).collect(),
      }),
    }
  }

  fn children_of(&self, parent_id: &str) -> &[&'a Step] {
    self
      .children
      .get(parent_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Build the node for `step`, recursing until no step references it.
  ///
  /// `path` holds the ids on the current ancestor chain.
  fn node(&self, step: &'a Step, path: &mut HashSet<&'a str>) -> Result<StepNode, WorkflowError> {
    if !path.insert(step.id.as_str()) {
      return Err(WorkflowError::Cycle {
        step_id: step.id.clone(),
      });
    }

    let children = self
      .children_of(&step.id)
      .iter()
      .map(|child| self.node(*child, path).map(Arc::new))
      .collect::<Result<Vec<_>, _>>()?;

    path.remove(step.id.as_str());

    Ok(StepNode {
      step: step.clone(),
      children,
    })
  }
}

/// Build the subtree(s) below `parent_id`.
///
/// With `None`, returns the single tree rooted at the unique parentless step
/// (zero or several parentless steps is an error). With `Some(id)`, returns
/// one subtree per step whose parent is `id`; a leaf id yields an empty list.
pub fn build_subtree<'a>(
  steps: &'a [Step],
  parent_id: Option<&'a str>,
) -> Result<Vec<StepNode>, WorkflowError> {
  let index = ChildIndex::new(steps);
  let mut path = HashSet::new();

  match parent_id {
    None => {
      let root = index.single_root()?;
      Ok(vec![index.node(root, &mut path)?])
    }
    Some(parent) => {
      path.insert(parent);
      index
        .children_of(parent)
        .iter()
        .map(|child| index.node(*child, &mut path))
        .collect()
    }
  }
}

/// A validated execution tree.
#[derive(Debug, Clone)]
pub struct StepTree {
  root: Arc<StepNode>,
  len: usize,
}

impl StepTree {
  /// Build and validate the tree for a flat step list.
  ///
  /// Fails if the list has no single root, contains duplicate ids, contains
  /// steps that cannot be reached from the root, or violates the step-type
  /// dependency table.
  pub fn build(steps: &[Step]) -> Result<Self, WorkflowError> {
    let mut seen = HashSet::new();
    for step in steps {
      if !seen.insert(step.id.as_str()) {
        return Err(WorkflowError::DuplicateStep(step.id.clone()));
      }
    }

    let index = ChildIndex::new(steps);
    let root_step = index.single_root()?;
    let root = index.node(root_step, &mut HashSet::new())?;

    let len = root.count();
    if len != steps.len() {
      let reachable: HashSet<&str> = StepIter::new(&root).map(|n| n.id()).collect();
      let mut step_ids: Vec<String> = steps
        .iter()
        .filter(|s| !reachable.contains(s.id.as_str()))
        .map(|s| s.id.clone())
        .collect();
      step_ids.sort();
      return Err(WorkflowError::UnreachableSteps { step_ids });
    }

    validate_structure(&root, &mut Vec::new())?;

    Ok(Self {
      root: Arc::new(root),
      len,
    })
  }

  pub fn root(&self) -> &Arc<StepNode> {
    &self.root
  }

  /// Number of steps in the tree.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Length of the longest root-to-leaf chain.
  pub fn depth(&self) -> usize {
    self.root.depth()
  }

  /// Pre-order traversal starting at the root.
  pub fn iter(&self) -> StepIter<'_> {
    StepIter::new(&self.root)
  }

  pub fn find(&self, step_id: &str) -> Option<&StepNode> {
    self.iter().find(|n| n.id() == step_id)
  }
}

/// Pre-order iterator over a [`StepNode`] tree.
pub struct StepIter<'a> {
  stack: Vec<&'a StepNode>,
}

impl<'a> StepIter<'a> {
  fn new(root: &'a StepNode) -> Self {
    Self { stack: vec![root] }
  }
}

impl<'a> Iterator for StepIter<'a> {
  type Item = &'a StepNode;

  fn next(&mut self) -> Option<Self::Item> {
    let node = self.stack.pop()?;
    self
      .stack
      .extend(node.children.iter().rev().map(|c| c.as_ref()));
    Some(node)
  }
}

/// Check the dependency table along every ancestor chain.
fn validate_structure(node: &StepNode, ancestors: &mut Vec<StepType>) -> Result<(), WorkflowError> {
  let step = &node.step;
  let violation = |message: String| WorkflowError::StructuralViolation {
    step_id: step.id.clone(),
    step_type: step.step_type,
    message,
  };

  let is_root = ancestors.is_empty();
  if is_root && step.step_type != StepType::Trigger {
    return Err(violation("the root step must be a trigger".to_string()));
  }
  if !is_root && step.step_type == StepType::Trigger {
    return Err(violation(
      "a trigger is only allowed as the workflow root".to_string(),
    ));
  }

  let required = step.step_type.required_ancestors();
  if !required.is_empty() && !required.iter().any(|t| ancestors.contains(t)) {
    let names: Vec<String> = required.iter().map(|t| t.to_string()).collect();
    return Err(violation(format!(
      "requires one of [{}] among its ancestors",
      names.join(", ")
    )));
  }

  ancestors.push(step.step_type);
  for child in &node.children {
    validate_structure(child, ancestors)?;
  }
  ancestors.pop();

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pipeline() -> Vec<Step> {
    vec![
      Step::new("publish", StepType::Publish, "social-media", Some("image")),
      Step::new("feed", StepType::ThirdParty, "rss-feed", Some("trigger")),
      Step::new("trigger", StepType::Trigger, "schedule", None),
      Step::new("image", StepType::GenerateImage, "generate-image", Some("feed")),
      Step::new("video", StepType::GenerateVideo, "generate-video", Some("feed")),
    ]
  }

  fn shape(node: &StepNode) -> String {
    if node.is_leaf() {
      return node.id().to_string();
    }
    let children: Vec<String> = node.children.iter().map(|c| shape(c)).collect();
    format!("{}({})", node.id(), children.join(","))
  }

  #[test]
  fn test_build_contains_every_step_once() {
    let steps = pipeline();
    let tree = StepTree::build(&steps).unwrap();

    assert_eq!(tree.len(), steps.len());
    let mut ids: Vec<&str> = tree.iter().map(|n| n.id()).collect();
    ids.sort();
    assert_eq!(ids, vec!["feed", "image", "publish", "trigger", "video"]);
    assert_eq!(tree.depth(), 4);
  }

  #[test]
  fn test_shape_independent_of_input_order() {
    let steps = pipeline();
    let mut reversed = steps.clone();
    reversed.reverse();

    let a = StepTree::build(&steps).unwrap();
    let b = StepTree::build(&reversed).unwrap();
    assert_eq!(shape(a.root()), shape(b.root()));
    assert_eq!(shape(a.root()), "trigger(feed(image(publish),video))");
  }

  #[test]
  fn test_build_subtree_by_parent() {
    let steps = pipeline();

    let below_feed = build_subtree(&steps, Some("feed")).unwrap();
    let ids: Vec<&str> = below_feed.iter().map(|n| n.id()).collect();
    assert_eq!(ids, vec!["image", "video"]);

    let below_leaf = build_subtree(&steps, Some("publish")).unwrap();
    assert!(below_leaf.is_empty());

    let whole = build_subtree(&steps, None).unwrap();
    assert_eq!(whole.len(), 1);
    assert_eq!(whole[0].id(), "trigger");
  }

  #[test]
  fn test_no_root_is_error() {
    let steps = vec![
      Step::new("a", StepType::ThirdParty, "rss-feed", Some("b")),
      Step::new("b", StepType::ThirdParty, "rss-feed", Some("a")),
    ];
    assert!(matches!(
      StepTree::build(&steps),
      Err(WorkflowError::NoRoot)
    ));
  }

  #[test]
  fn test_two_roots_is_error() {
    let steps = vec![
      Step::new("a", StepType::Trigger, "api", None),
      Step::new("b", StepType::Trigger, "schedule", None),
    ];
    match StepTree::build(&steps) {
      Err(WorkflowError::MultipleRoots { step_ids }) => assert_eq!(step_ids, vec!["a", "b"]),
      other => panic!("expected MultipleRoots, got {:?}", other),
    }
  }

  #[test]
  fn test_unreachable_steps_are_reported() {
    let mut steps = pipeline();
    steps.push(Step::new(
      "orphan",
      StepType::GenerateImage,
      "generate-image",
      Some("missing"),
    ));

    match StepTree::build(&steps) {
      Err(WorkflowError::UnreachableSteps { step_ids }) => assert_eq!(step_ids, vec!["orphan"]),
      other => panic!("expected UnreachableSteps, got {:?}", other),
    }
  }

  #[test]
  fn test_cycle_detected_from_subtree() {
    let steps = vec![
      Step::new("t", StepType::Trigger, "api", None),
      Step::new("a", StepType::ThirdParty, "rss-feed", Some("b")),
      Step::new("b", StepType::ThirdParty, "rss-feed", Some("a")),
    ];
    assert!(matches!(
      build_subtree(&steps, Some("a")),
      Err(WorkflowError::Cycle { .. })
    ));
  }

  #[test]
  fn test_duplicate_ids_rejected() {
    let steps = vec![
      Step::new("t", StepType::Trigger, "api", None),
      Step::new("t", StepType::ThirdParty, "rss-feed", Some("t")),
    ];
    assert!(matches!(
      StepTree::build(&steps),
      Err(WorkflowError::DuplicateStep(id)) if id == "t"
    ));
  }

  #[test]
  fn test_publish_without_generation_ancestor_is_violation() {
    let steps = vec![
      Step::new("t", StepType::Trigger, "api", None),
      Step::new("feed", StepType::ThirdParty, "rss-feed", Some("t")),
      Step::new("post", StepType::Publish, "social-media", Some("feed")),
    ];
    match StepTree::build(&steps) {
      Err(WorkflowError::StructuralViolation {
        step_id, step_type, ..
      }) => {
        assert_eq!(step_id, "post");
        assert_eq!(step_type, StepType::Publish);
      }
      other => panic!("expected StructuralViolation, got {:?}", other),
    }
  }

  #[test]
  fn test_root_must_be_trigger() {
    let steps = vec![Step::new(
      "img",
      StepType::GenerateImage,
      "generate-image",
      None,
    )];
    assert!(matches!(
      StepTree::build(&steps),
      Err(WorkflowError::StructuralViolation { .. })
    ));
  }

  #[test]
  fn test_nested_trigger_is_violation() {
    let steps = vec![
      Step::new("t", StepType::Trigger, "api", None),
      Step::new("t2", StepType::Trigger, "schedule", Some("t")),
    ];
    assert!(matches!(
      StepTree::build(&steps),
      Err(WorkflowError::StructuralViolation { step_id, .. }) if step_id == "t2"
    ));
  }

  #[test]
  fn test_find_node() {
    let tree = StepTree::build(&pipeline()).unwrap();
    let image = tree.find("image").unwrap();
    assert_eq!(image.step.behavior_id, "generate-image");
    assert_eq!(image.children.len(), 1);
    assert!(tree.find("nope").is_none());
  }
}
