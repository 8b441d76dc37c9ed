use super::llm::{extract_json_object, CompletionModel};
use crate::error::StudyError;
use crate::models::MindMap;

const MIND_MAP_TEMPERATURE: f32 = 0.2;
const MIND_MAP_MAX_TOKENS: u32 = 1500;

/// Extracts entities and their relationships from study material as a
/// node/link graph.
pub async fn generate_mind_map(
    model: &dyn CompletionModel,
    text: &str,
) -> Result<MindMap, StudyError> {
    let prompt = format!(
        "Extract the key entities and relationships from the following study material as a \
         mind map. Respond with only a JSON object of the form {{\"nodes\": [{{\"id\": \"...\", \
         \"type\": \"Concept|Person|Organization|Event\"}}], \"links\": [{{\"source\": \"...\", \
         \"target\": \"...\", \"relation\": \"...\"}}]}}.\n\n{text}"
    );

    let reply = model
        .complete(&prompt, MIND_MAP_TEMPERATURE, MIND_MAP_MAX_TOKENS)
        .await?;

    parse_mind_map(&reply)
}

fn parse_mind_map(reply: &str) -> Result<MindMap, StudyError> {
    if let Ok(map) = serde_json::from_str::<MindMap>(reply) {
        return Ok(map);
    }

    let extracted = extract_json_object(reply)
        .ok_or_else(|| StudyError::MalformedOutput("reply contains no JSON object".to_string()))?;

    serde_json::from_str::<MindMap>(extracted)
        .map_err(|error| StudyError::MalformedOutput(error.to_string()))
}

fn node_color(node_type: Option<&str>) -> &'static str {
    match node_type {
        Some("Concept") => "#aed6f1",
        Some("Person") => "#d4aed1",
        Some("Organization") => "#aed1c9",
        Some("Event") => "#f1c40f",
        _ => "#f1d4b1",
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Renders the mind map as Graphviz DOT, left to right, with nodes colored
/// by type. Nodes with a blank id and links missing an endpoint are skipped;
/// links with a blank relation are drawn without a label.
pub fn render_dot(map: &MindMap) -> String {
    let mut dot = String::new();
    dot.push_str("digraph mind_map {\n");
    dot.push_str("  rankdir=LR;\n");
    dot.push_str("  bgcolor=\"#f7f7f7\";\n");
    dot.push_str("  node [style=filled];\n");

    for node in &map.nodes {
        if node.id.trim().is_empty() {
            continue;
        }
        let color = node_color(node.node_type.as_deref());
        dot.push_str(&format!(
            "  \"{}\" [fillcolor=\"{}\"];\n",
            escape(&node.id),
            color
        ));
    }

    for link in &map.links {
        if link.source.trim().is_empty() || link.target.trim().is_empty() {
            continue;
        }
        let relation = link.relation.trim();
        if relation.is_empty() {
            dot.push_str(&format!(
                "  \"{}\" -> \"{}\" [color=\"#7f8c8d\"];\n",
                escape(&link.source),
                escape(&link.target)
            ));
        } else {
            dot.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\", color=\"#7f8c8d\"];\n",
                escape(&link.source),
                escape(&link.target),
                escape(relation)
            ));
        }
    }

    dot.push_str("}\n");
    dot
}

#[cfg(test)]
mod tests {
    use super::{parse_mind_map, render_dot};
    use crate::error::StudyError;
    use crate::models::{MindMap, MindMapLink, MindMapNode};

    #[test]
    fn clean_json_object_parses_directly() {
        let reply = r#"{
            "nodes": [{"id": "Neuron", "type": "Concept"}],
            "links": [{"source": "Brain", "target": "Neuron", "relation": "contains"}]
        }"#;

        let map = parse_mind_map(reply).unwrap();

        assert_eq!(map.nodes.len(), 1);
        assert_eq!(map.links[0].relation, "contains");
    }

    #[test]
    fn fenced_reply_falls_back_to_extraction() {
        let reply = "Here is the graph:\n```json\n{\"nodes\": [{\"id\": \"A\"}], \"links\": []}\n```";
        let map = parse_mind_map(reply).unwrap();

        assert_eq!(map.nodes.len(), 1);
        assert!(map.nodes[0].node_type.is_none());
    }

    #[test]
    fn prose_reply_is_malformed() {
        let result = parse_mind_map("The main concepts are neurons and synapses.");
        assert!(matches!(result, Err(StudyError::MalformedOutput(_))));
    }

    #[test]
    fn dot_output_colors_nodes_by_type() {
        let map = MindMap {
            nodes: vec![
                MindMapNode {
                    id: "Turing".to_string(),
                    node_type: Some("Person".to_string()),
                },
                MindMapNode {
                    id: "Computation".to_string(),
                    node_type: None,
                },
            ],
            links: vec![MindMapLink {
                source: "Turing".to_string(),
                target: "Computation".to_string(),
                relation: "formalized".to_string(),
            }],
        };

        let dot = render_dot(&map);

        assert!(dot.starts_with("digraph mind_map {"));
        assert!(dot.contains("rankdir=LR;"));
        assert!(dot.contains("\"Turing\" [fillcolor=\"#d4aed1\"];"));
        assert!(dot.contains("\"Computation\" [fillcolor=\"#f1d4b1\"];"));
        assert!(dot.contains("\"Turing\" -> \"Computation\" [label=\"formalized\", color=\"#7f8c8d\"];"));
    }

    #[test]
    fn quotes_in_labels_are_escaped_and_blank_relations_unlabeled() {
        let map = MindMap {
            nodes: vec![MindMapNode {
                id: "\"Maxwell\" equations".to_string(),
                node_type: Some("Concept".to_string()),
            }],
            links: vec![MindMapLink {
                source: "A".to_string(),
                target: "B".to_string(),
                relation: "  ".to_string(),
            }],
        };

        let dot = render_dot(&map);

        assert!(dot.contains("\"\\\"Maxwell\\\" equations\""));
        assert!(dot.contains("\"A\" -> \"B\" [color=\"#7f8c8d\"];"));
        assert!(!dot.contains("label=\"  \""));
    }

    #[test]
    fn blank_ids_and_dangling_links_are_dropped() {
        let map = MindMap {
            nodes: vec![
                MindMapNode {
                    id: "  ".to_string(),
                    node_type: None,
                },
                MindMapNode {
                    id: "Kept".to_string(),
                    node_type: None,
                },
            ],
            links: vec![MindMapLink {
                source: "Kept".to_string(),
                target: "".to_string(),
                relation: "points at nothing".to_string(),
            }],
        };

        let dot = render_dot(&map);

        assert!(dot.contains("\"Kept\" [fillcolor="));
        assert!(!dot.contains("\"  \""));
        assert!(!dot.contains("->"));
    }
}
