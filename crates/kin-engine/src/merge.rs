//! Merged-tree construction.
//!
//! Given a set of member users, fold their ancestor records into one
//! deduplicated graph: connected components over confirmed-match edges
//! become single nodes, and parent-child edges are inferred from stated
//! relations. The graph is transient — recomputed on every request, never
//! persisted; only the member-set snapshot is stored.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use kin_core::{
  ancestor::{Ancestor, MediaType},
  store::HeritageStore,
  tree::{
    Contributor, EdgeKind, FactContribution, MergedFamilyTree, MergedNode,
    MergedTree, StoryContribution, TreeEdge,
  },
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Union-find ──────────────────────────────────────────────────────────────

/// Disjoint-set forest keyed by ancestor id. Confirmed matches are union
/// edges; components are the merge clusters. A chain of matches (A–B, B–C)
/// lands A, B, and C in one component without a direct A–C row.
struct DisjointSet {
  parent: Vec<usize>,
  rank:   Vec<u8>,
  index:  HashMap<Uuid, usize>,
}

impl DisjointSet {
  fn new() -> Self {
    Self {
      parent: Vec::new(),
      rank:   Vec::new(),
      index:  HashMap::new(),
    }
  }

  fn add(&mut self, id: Uuid) {
    if !self.index.contains_key(&id) {
      let slot = self.parent.len();
      self.parent.push(slot);
      self.rank.push(0);
      self.index.insert(id, slot);
    }
  }

  fn find(&mut self, mut i: usize) -> usize {
    while self.parent[i] != i {
      // Path halving.
      self.parent[i] = self.parent[self.parent[i]];
      i = self.parent[i];
    }
    i
  }

  fn union(&mut self, a: Uuid, b: Uuid) {
    let (Some(&ia), Some(&ib)) = (self.index.get(&a), self.index.get(&b))
    else {
      return;
    };
    let (ra, rb) = (self.find(ia), self.find(ib));
    if ra == rb {
      return;
    }
    match self.rank[ra].cmp(&self.rank[rb]) {
      std::cmp::Ordering::Less => self.parent[ra] = rb,
      std::cmp::Ordering::Greater => self.parent[rb] = ra,
      std::cmp::Ordering::Equal => {
        self.parent[rb] = ra;
        self.rank[ra] += 1;
      }
    }
  }

  fn root_of(&mut self, id: Uuid) -> usize {
    let i = self.index[&id];
    self.find(i)
  }
}

// ─── Merger ──────────────────────────────────────────────────────────────────

/// Combines multiple users' family trees into a unified view.
pub struct TreeMerger<S> {
  store:      Arc<S>,
  member_ids: Vec<Uuid>,
}

impl<S> TreeMerger<S>
where
  S: HeritageStore,
{
  pub fn new(store: Arc<S>, member_ids: Vec<Uuid>) -> Self {
    Self { store, member_ids }
  }

  /// Build the deduplicated graph for the member set.
  pub async fn build_merged_tree(&self) -> Result<MergedTree> {
    // Load every member's ancestors; this order is the load order that
    // first-wins field merging refers to.
    let mut ancestors: Vec<Ancestor> = Vec::new();
    for user_id in &self.member_ids {
      ancestors.extend(
        self
          .store
          .ancestors_for_user(*user_id)
          .await
          .map_err(Error::store)?,
      );
    }

    let matches = self
      .store
      .confirmed_matches_for_users(&self.member_ids)
      .await
      .map_err(Error::store)?;

    // Cluster into components.
    let mut sets = DisjointSet::new();
    let known: HashSet<Uuid> =
      ancestors.iter().map(|a| a.ancestor_id).collect();
    for a in &ancestors {
      sets.add(a.ancestor_id);
    }
    for m in &matches {
      if known.contains(&m.ancestor_a) && known.contains(&m.ancestor_b) {
        sets.union(m.ancestor_a, m.ancestor_b);
      }
    }

    // Group members per component, preserving load order within and
    // across groups.
    let mut groups: Vec<Vec<&Ancestor>> = Vec::new();
    let mut group_of_root: HashMap<usize, usize> = HashMap::new();
    for a in &ancestors {
      let root = sets.root_of(a.ancestor_id);
      match group_of_root.get(&root) {
        Some(&slot) => groups[slot].push(a),
        None => {
          group_of_root.insert(root, groups.len());
          groups.push(vec![a]);
        }
      }
    }

    let mut nodes = Vec::with_capacity(groups.len());
    for group in &groups {
      nodes.push(self.merge_group(group).await?);
    }

    let edges = infer_edges(&nodes);

    Ok(MergedTree {
      nodes,
      edges,
      clusters: Default::default(),
    })
  }

  /// Fold one component into a node. Scalars are first-non-null over the
  /// members in load order; facts, stories, and photos are unions tagged
  /// with the contributing user.
  async fn merge_group(&self, group: &[&Ancestor]) -> Result<MergedNode> {
    let first = group[0];
    let id = if group.len() > 1 {
      format!("merged_{}", first.ancestor_id)
    } else {
      format!("single_{}", first.ancestor_id)
    };

    let mut node = MergedNode {
      id,
      name: first.name.clone(),
      birth_year: None,
      death_year: None,
      origin: None,
      facts: Default::default(),
      stories: Vec::new(),
      contributors: Vec::new(),
      photo_urls: Vec::new(),
    };

    for member in group {
      if node.birth_year.is_none() {
        node.birth_year = member.birth_year;
      }
      if node.death_year.is_none() {
        node.death_year = member.death_year;
      }
      if node.origin.is_none() {
        node.origin = member.origin.clone();
      }

      for fact in self
        .store
        .facts_for_ancestor(member.ancestor_id)
        .await
        .map_err(Error::store)?
      {
        node.facts.entry(fact.key).or_default().push(FactContribution {
          value:   fact.value,
          user_id: member.user_id,
        });
      }

      for story in self
        .store
        .stories_for_ancestor(member.ancestor_id)
        .await
        .map_err(Error::store)?
      {
        node.stories.push(StoryContribution {
          content: story.content,
          user_id: story.user_id,
        });
      }

      for media in self
        .store
        .media_for_ancestor(member.ancestor_id)
        .await
        .map_err(Error::store)?
      {
        if media.media_type == MediaType::Photo {
          node.photo_urls.push(media.url);
        }
      }

      node.contributors.push(Contributor {
        user_id:  member.user_id,
        relation: member.relation.clone(),
      });
    }

    Ok(node)
  }

  /// Persist the member-set snapshot. The graph itself is rebuilt on
  /// demand.
  pub async fn save_merged_tree(
    &self,
    name: &str,
    created_by: Uuid,
  ) -> Result<MergedFamilyTree> {
    self
      .store
      .create_merged_tree(name, created_by, &self.member_ids)
      .await
      .map_err(Error::store)
  }
}

// ─── Edge inference ──────────────────────────────────────────────────────────

/// Single-hop parent-child inference: a node someone calls father/mother is
/// the child of a node the *same user* calls grandfather/grandmother. Only
/// nodes sharing a contributing user are ever connected; this is a
/// heuristic, not a transitive closure.
fn infer_edges(nodes: &[MergedNode]) -> Vec<TreeEdge> {
  let mut edges = Vec::new();

  for node in nodes {
    for contributor in &node.contributors {
      let relation = contributor.relation.to_lowercase();
      if !relation.contains("father") && !relation.contains("mother") {
        continue;
      }

      for other in nodes {
        if other.id == node.id {
          continue;
        }
        for other_contributor in &other.contributors {
          let other_relation = other_contributor.relation.to_lowercase();
          if (other_relation.contains("grandfather")
            || other_relation.contains("grandmother"))
            && other_contributor.user_id == contributor.user_id
          {
            edges.push(TreeEdge {
              from: other.id.clone(),
              to:   node.id.clone(),
              kind: EdgeKind::ParentChild,
            });
          }
        }
      }
    }
  }

  edges
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use kin_core::{
    ancestor::{NewAncestor, NewMedia, NewStory},
    matching::{
      MatchStatus, MatchingAttributes, NewAncestorMatch,
    },
  };
  use kin_store_sqlite::SqliteStore;

  use super::*;

  async fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
  }

  fn ancestor_input(
    user_id: Uuid,
    unique_id: &str,
    name: &str,
    relation: &str,
  ) -> NewAncestor {
    NewAncestor {
      user_id,
      unique_id: unique_id.to_string(),
      name: name.to_string(),
      relation: relation.to_string(),
      birth_year: None,
      death_year: None,
      birth_place: None,
      origin: None,
    }
  }

  async fn confirm_match(store: &SqliteStore, a: Uuid, b: Uuid) {
    let m = store
      .insert_match(NewAncestorMatch {
        ancestor_a:          a,
        ancestor_b:          b,
        confidence:          0.9,
        matching_attributes: MatchingAttributes::default(),
        status:              MatchStatus::Suggested,
      })
      .await
      .unwrap();
    store
      .set_match_status(m.match_id, MatchStatus::Confirmed)
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn unmatched_ancestors_become_singleton_nodes() {
    let s = store().await;
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    s.upsert_ancestor(ancestor_input(u1, "a", "Bjorn", "grandfather"))
      .await
      .unwrap();
    s.upsert_ancestor(ancestor_input(u2, "b", "Sigrid", "grandmother"))
      .await
      .unwrap();

    let merger = TreeMerger::new(s, vec![u1, u2]);
    let tree = merger.build_merged_tree().await.unwrap();

    assert_eq!(tree.nodes.len(), 2);
    assert!(tree.nodes.iter().all(|n| n.id.starts_with("single_")));
    assert!(tree.edges.is_empty());
    assert!(tree.clusters.is_empty());
  }

  #[tokio::test]
  async fn confirmed_match_chain_merges_transitively() {
    let s = store().await;
    let (u1, u2, u3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    let (a, _) = s
      .upsert_ancestor(ancestor_input(u1, "a", "Bjorn Hansen", "grandfather"))
      .await
      .unwrap();
    let (b, _) = s
      .upsert_ancestor(ancestor_input(u2, "b", "Bjorn Hanson", "uncle"))
      .await
      .unwrap();
    let (c, _) = s
      .upsert_ancestor(ancestor_input(u3, "c", "Bjorn H", "great-uncle"))
      .await
      .unwrap();

    // A–B and B–C confirmed; no A–C row exists.
    confirm_match(&s, a.ancestor_id, b.ancestor_id).await;
    confirm_match(&s, b.ancestor_id, c.ancestor_id).await;

    let merger = TreeMerger::new(s, vec![u1, u2, u3]);
    let tree = merger.build_merged_tree().await.unwrap();

    assert_eq!(tree.nodes.len(), 1);
    let node = &tree.nodes[0];
    assert!(node.id.starts_with("merged_"));
    assert_eq!(node.contributors.len(), 3);
    // Representative name: the first member in load order.
    assert_eq!(node.name, "Bjorn Hansen");
  }

  #[tokio::test]
  async fn suggested_matches_do_not_merge() {
    let s = store().await;
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    let (a, _) = s
      .upsert_ancestor(ancestor_input(u1, "a", "Bjorn", "grandfather"))
      .await
      .unwrap();
    let (b, _) = s
      .upsert_ancestor(ancestor_input(u2, "b", "Bjorn", "uncle"))
      .await
      .unwrap();

    s.insert_match(NewAncestorMatch {
      ancestor_a:          a.ancestor_id,
      ancestor_b:          b.ancestor_id,
      confidence:          0.9,
      matching_attributes: MatchingAttributes::default(),
      status:              MatchStatus::Suggested,
    })
    .await
    .unwrap();

    let merger = TreeMerger::new(s, vec![u1, u2]);
    let tree = merger.build_merged_tree().await.unwrap();
    assert_eq!(tree.nodes.len(), 2);
  }

  #[tokio::test]
  async fn scalar_fields_merge_first_wins() {
    let s = store().await;
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    let mut first = ancestor_input(u1, "a", "Bjorn", "grandfather");
    first.birth_year = Some(1920);
    let (a, _) = s.upsert_ancestor(first).await.unwrap();

    let mut second = ancestor_input(u2, "b", "Bjorn", "uncle");
    second.birth_year = Some(1921);
    second.death_year = Some(1999);
    second.origin = Some("Norway".into());
    let (b, _) = s.upsert_ancestor(second).await.unwrap();

    confirm_match(&s, a.ancestor_id, b.ancestor_id).await;

    let merger = TreeMerger::new(s, vec![u1, u2]);
    let tree = merger.build_merged_tree().await.unwrap();
    let node = &tree.nodes[0];

    // First member's value wins where present; gaps fill from later
    // members.
    assert_eq!(node.birth_year, Some(1920));
    assert_eq!(node.death_year, Some(1999));
    assert_eq!(node.origin.as_deref(), Some("Norway"));
  }

  #[tokio::test]
  async fn facts_stories_and_photos_union_with_attribution() {
    let s = store().await;
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    let (a, _) = s
      .upsert_ancestor(ancestor_input(u1, "a", "Bjorn", "grandfather"))
      .await
      .unwrap();
    let (b, _) = s
      .upsert_ancestor(ancestor_input(u2, "b", "Bjorn", "uncle"))
      .await
      .unwrap();

    s.apply_extraction(
      u1,
      &kin_core::extraction::Extraction {
        facts: vec![kin_core::extraction::FactRecord {
          person_id: "a".into(),
          key:       "occupation".into(),
          value:     "fisherman".into(),
        }],
        ..Default::default()
      },
    )
    .await
    .unwrap();

    s.add_story(NewStory {
      ancestor_id: b.ancestor_id,
      user_id:     u2,
      content:     "He sailed to Iceland.".into(),
      context:     None,
    })
    .await
    .unwrap();

    s.add_media(NewMedia {
      ancestor_id: b.ancestor_id,
      user_id:     u2,
      url:         "https://media.example/bjorn.jpg".into(),
      media_type:  MediaType::Photo,
      title:       None,
    })
    .await
    .unwrap();

    confirm_match(&s, a.ancestor_id, b.ancestor_id).await;

    let merger = TreeMerger::new(s, vec![u1, u2]);
    let tree = merger.build_merged_tree().await.unwrap();
    let node = &tree.nodes[0];

    let occupation = &node.facts["occupation"];
    assert_eq!(occupation.len(), 1);
    assert_eq!(occupation[0].value, "fisherman");
    assert_eq!(occupation[0].user_id, u1);

    assert_eq!(node.stories.len(), 1);
    assert_eq!(node.stories[0].user_id, u2);

    assert_eq!(node.photo_urls, ["https://media.example/bjorn.jpg"]);
  }

  #[tokio::test]
  async fn parent_child_edge_inferred_within_one_user() {
    let s = store().await;
    let u1 = Uuid::new_v4();

    s.upsert_ancestor(ancestor_input(u1, "erik", "Erik", "father"))
      .await
      .unwrap();
    s.upsert_ancestor(ancestor_input(u1, "bjorn", "Bjorn", "grandfather"))
      .await
      .unwrap();

    let merger = TreeMerger::new(s, vec![u1]);
    let tree = merger.build_merged_tree().await.unwrap();

    assert_eq!(tree.edges.len(), 1);
    let edge = &tree.edges[0];
    assert_eq!(edge.kind, EdgeKind::ParentChild);

    let erik = tree
      .nodes
      .iter()
      .find(|n| n.name == "Erik")
      .unwrap();
    let bjorn = tree
      .nodes
      .iter()
      .find(|n| n.name == "Bjorn")
      .unwrap();
    assert_eq!(edge.from, bjorn.id);
    assert_eq!(edge.to, erik.id);
  }

  #[tokio::test]
  async fn no_edge_across_users() {
    let s = store().await;
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    s.upsert_ancestor(ancestor_input(u1, "erik", "Erik", "father"))
      .await
      .unwrap();
    s.upsert_ancestor(ancestor_input(u2, "bjorn", "Bjorn", "grandfather"))
      .await
      .unwrap();

    let merger = TreeMerger::new(s, vec![u1, u2]);
    let tree = merger.build_merged_tree().await.unwrap();
    assert!(tree.edges.is_empty());
  }

  #[tokio::test]
  async fn save_merged_tree_persists_member_set_only() {
    let s = store().await;
    let (u1, u2) = (Uuid::new_v4(), Uuid::new_v4());

    let merger = TreeMerger::new(s.clone(), vec![u1, u2]);
    let snapshot = merger.save_merged_tree("Hansen clan", u1).await.unwrap();

    let fetched = s
      .get_merged_tree(snapshot.tree_id)
      .await
      .unwrap()
      .expect("snapshot exists");
    assert_eq!(fetched.name, "Hansen clan");
    assert_eq!(fetched.created_by, u1);
    assert_eq!(fetched.member_ids, vec![u1, u2]);
  }
}
