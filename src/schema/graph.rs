//! schema 之间的直接映射关系图

use std::collections::{HashMap, VecDeque};

use super::SchemaId;

/// 有向图，边的声明顺序决定等长路径的选择
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    edges: Vec<(SchemaId, SchemaId)>,
}

impl SchemaGraph {
    pub fn new(edges: Vec<(SchemaId, SchemaId)>) -> Self {
        Self { edges }
    }

    pub fn edges(&self) -> &[(SchemaId, SchemaId)] {
        &self.edges
    }

    fn neighbours(&self, node: SchemaId) -> impl Iterator<Item = SchemaId> + '_ {
        self.edges
            .iter()
            .filter(move |(from, _)| *from == node)
            .map(|(_, to)| *to)
    }

    /// 广度优先的最短路径（含首尾）；每个节点只记录第一个发现它的前驱
    pub fn shortest_path(&self, from: SchemaId, to: SchemaId) -> Option<Vec<SchemaId>> {
        if from == to {
            return Some(vec![from]);
        }
        let mut prev: HashMap<SchemaId, SchemaId> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        while let Some(node) = queue.pop_front() {
            for next in self.neighbours(node) {
                if next == from || prev.contains_key(&next) {
                    continue;
                }
                prev.insert(next, node);
                if next == to {
                    let mut path = vec![to];
                    let mut cur = to;
                    while let Some(&p) = prev.get(&cur) {
                        path.push(p);
                        cur = p;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(next);
            }
        }
        None
    }
}
