use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use crate::normalize::task_ids;

/// A prerequisite edge `(task, depends_on)` removed to keep the graph acyclic
pub type DroppedEdge = (String, String);

/// Filter a raw dependency map to the known task ids
///
/// Unknown keys and values are dropped, as are self-dependencies and
/// entries left with no prerequisites.
pub fn filter_dependencies(
    raw: Option<&Value>,
    universe: &[String],
) -> BTreeMap<String, Vec<String>> {
    let Some(Value::Object(map)) = raw else {
        return BTreeMap::new();
    };

    map.iter()
        .filter_map(|(key, value)| {
            let task = key.trim();
            if !universe.iter().any(|id| id == task) {
                return None;
            }
            let deps: Vec<String> = task_ids(Some(value))
                .into_iter()
                .filter(|dep| dep != task && universe.contains(dep))
                .collect();
            (!deps.is_empty()).then(|| (task.to_string(), deps))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Drop every edge that closes a cycle
///
/// Tasks are visited depth-first in `order`, prerequisites in listed order;
/// an edge back to a task still on the stack is removed.
pub fn break_cycles(
    order: &[String],
    dependencies: BTreeMap<String, Vec<String>>,
) -> (BTreeMap<String, Vec<String>>, Vec<DroppedEdge>) {
    let index: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut adjacency = vec![Vec::new(); order.len()];
    for (task, deps) in &dependencies {
        if let Some(&from) = index.get(task.as_str()) {
            adjacency[from] = deps
                .iter()
                .filter_map(|dep| index.get(dep.as_str()).copied())
                .collect();
        }
    }

    let mut marks = vec![Mark::Unvisited; order.len()];
    let mut kept = vec![Vec::new(); order.len()];
    let mut dropped = Vec::new();

    for start in 0..order.len() {
        if marks[start] == Mark::Unvisited {
            visit(start, &adjacency, &mut marks, &mut kept, &mut dropped);
        }
    }

    let acyclic = kept
        .into_iter()
        .enumerate()
        .filter(|(_, deps)| !deps.is_empty())
        .map(|(task, deps)| {
            (
                order[task].clone(),
                deps.into_iter().map(|dep| order[dep].clone()).collect(),
            )
        })
        .collect();

    let dropped = dropped
        .into_iter()
        .map(|(task, dep)| (order[task].clone(), order[dep].clone()))
        .collect();

    (acyclic, dropped)
}

fn visit(
    node: usize,
    adjacency: &[Vec<usize>],
    marks: &mut [Mark],
    kept: &mut [Vec<usize>],
    dropped: &mut Vec<(usize, usize)>,
) {
    marks[node] = Mark::OnStack;
    for &dep in &adjacency[node] {
        match marks[dep] {
            Mark::OnStack => dropped.push((node, dep)),
            Mark::Unvisited => {
                visit(dep, adjacency, marks, kept, dropped);
                kept[node].push(dep);
            }
            Mark::Done => kept[node].push(dep),
        }
    }
    marks[node] = Mark::Done;
}
