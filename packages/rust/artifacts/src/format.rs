//! Renders a [`TopicModelResult`] into the text and tables that get persisted.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use topicscrape_topics::{
    FoundTopics, TermWeight, TopicFrequency, TopicId, TopicInfo, TopicModelResult,
};

use crate::table::Table;

/// `term (0.0512)`
pub fn term_cell(term: &TermWeight) -> String {
    format!("{} ({:.4})", term.term, term.weight)
}

pub fn topic_info_table(rows: &[TopicInfo]) -> Table {
    let mut table = Table::new(["Topic", "Count", "Name"]);
    for row in rows {
        table.push_row([row.topic.to_string(), row.count.to_string(), row.name.clone()]);
    }
    table
}

pub fn topic_frequency_table(rows: &[TopicFrequency]) -> Table {
    let mut table = Table::new(["Topic", "Count"]);
    for row in rows {
        table.push_row([row.topic.to_string(), row.count.to_string()]);
    }
    table
}

/// Raw search-term result: one row per matched topic, best first.
pub fn found_topics_table(found: &FoundTopics) -> Table {
    let mut table = Table::new(["Topic", "Similarity"]);
    for (topic, similarity) in found.pairs() {
        table.push_row([topic.to_string(), format!("{similarity:.4}")]);
    }
    table
}

/// Every topic followed by its ranked terms, one topic per line.
pub fn all_topics_text(topics: &BTreeMap<TopicId, Vec<TermWeight>>) -> String {
    let mut out = String::new();
    for (topic, terms) in topics {
        let terms: Vec<String> = terms.iter().map(term_cell).collect();
        let _ = writeln!(out, "{topic}: {}", terms.join(", "));
    }
    out
}

pub fn representative_docs_text(docs: &BTreeMap<TopicId, Vec<String>>) -> String {
    let mut out = String::new();
    for (topic, texts) in docs {
        let _ = writeln!(out, "Topic {topic}:");
        for text in texts {
            // Keep one document per line.
            let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
            let _ = writeln!(out, "  - {flat}");
        }
    }
    out
}

/// Search-term-focused table.
///
/// Columns are the matched topic ids. The first row holds each topic's
/// salience; the following `Terms` rows hold the n-th ranked term of every
/// matched topic.
pub fn formatted_found_topics(result: &TopicModelResult) -> Table {
    let mut header = vec![String::new()];
    header.extend(result.found_topics.topics.iter().map(|id| id.to_string()));
    let mut table = Table::new(header);

    let mut salience = vec!["Salience".to_string()];
    salience.extend(result.found_topics.similarity.iter().map(|s| format!("{s:.4}")));
    table.push_row(salience);

    let depth = result
        .found_topic_terms
        .iter()
        .map(|(_, terms)| terms.len())
        .max()
        .unwrap_or(0);
    for n in 0..depth {
        let mut row = vec!["Terms".to_string()];
        row.extend(
            result
                .found_topic_terms
                .iter()
                .map(|(_, terms)| terms.get(n).map(term_cell).unwrap_or_default()),
        );
        table.push_row(row);
    }
    table
}

/// All topics keyed by their human-readable name, one ranked term per column.
pub fn formatted_all_topics(result: &TopicModelResult) -> Table {
    let depth = result
        .topic_info
        .iter()
        .filter_map(|info| result.all_topics.get(&info.topic))
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let mut header = vec!["Name".to_string()];
    header.extend((0..depth).map(|n| n.to_string()));
    let mut table = Table::new(header);

    for info in &result.topic_info {
        let mut row = vec![info.name.clone()];
        if let Some(terms) = result.all_topics.get(&info.topic) {
            row.extend(terms.iter().map(term_cell));
        }
        table.push_row(row);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tw(term: &str, weight: f64) -> TermWeight {
        TermWeight {
            term: term.into(),
            weight,
        }
    }

    fn result() -> TopicModelResult {
        TopicModelResult {
            search_term: "policy".into(),
            topic_info: vec![
                TopicInfo {
                    topic: -1,
                    count: 3,
                    name: "-1_the_of".into(),
                },
                TopicInfo {
                    topic: 0,
                    count: 5,
                    name: "0_budget_tax".into(),
                },
            ],
            all_topics: BTreeMap::from([
                (-1, vec![tw("the", 0.2)]),
                (0, vec![tw("budget", 0.12), tw("tax", 0.08)]),
            ]),
            found_topics: FoundTopics {
                topics: vec![0, -1],
                similarity: vec![0.71, 0.2],
            },
            found_topic_terms: vec![
                (0, vec![tw("budget", 0.12), tw("tax", 0.08)]),
                (-1, vec![tw("the", 0.2)]),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn found_topics_are_exploded_per_term() {
        let csv = formatted_found_topics(&result()).to_csv();
        assert_eq!(
            csv,
            ",0,-1\n\
             Salience,0.7100,0.2000\n\
             Terms,budget (0.1200),the (0.2000)\n\
             Terms,tax (0.0800),\n"
        );
    }

    #[test]
    fn no_matches_still_has_salience_row() {
        let mut empty = result();
        empty.found_topics = FoundTopics::default();
        empty.found_topic_terms.clear();
        assert_eq!(formatted_found_topics(&empty).to_csv(), "\nSalience\n");
    }

    #[test]
    fn all_topics_indexed_by_name() {
        let csv = formatted_all_topics(&result()).to_csv();
        assert_eq!(
            csv,
            "Name,0,1\n\
             -1_the_of,the (0.2000),\n\
             0_budget_tax,budget (0.1200),tax (0.0800)\n"
        );
    }

    #[test]
    fn text_renderings() {
        let r = result();
        assert_eq!(
            all_topics_text(&r.all_topics),
            "-1: the (0.2000)\n0: budget (0.1200), tax (0.0800)\n"
        );

        let docs = BTreeMap::from([(0, vec!["Budget\nvote passed".to_string()])]);
        assert_eq!(
            representative_docs_text(&docs),
            "Topic 0:\n  - Budget vote passed\n"
        );

        let table = found_topics_table(&r.found_topics);
        assert_eq!(table.rows()[0], vec!["0", "0.7100"]);
    }
}
