use std::env;

use tracing::warn;

use crate::store::types::Document;

/// Opening sentence of every context block, present even when no category
/// has records.
pub const PREAMBLE: &str = "Here is the alumni platform data:";

const MISSING_FIELD: &str = "N/A";

/// The data categories the assistant can speak about, in the order they
/// appear in the context block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Events,
    Fundraising,
    Internships,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::Events,
        Category::Fundraising,
        Category::Internships,
    ];

    /// Name of the backing collection in the document store.
    pub fn collection(self) -> &'static str {
        match self {
            Category::Events => "events",
            Category::Fundraising => "fundraising",
            Category::Internships => "internships",
        }
    }

    fn header(self) -> &'static str {
        match self {
            Category::Events => "Events:",
            Category::Fundraising => "Fundraising Campaigns:",
            Category::Internships => "Internships:",
        }
    }

    /// One line per record, every field slot filled; absent values render
    /// as a placeholder rather than dropping the line.
    fn render_line(self, record: &Document) -> String {
        let field =
            |key: &str| record.display_field(key).unwrap_or_else(|| MISSING_FIELD.to_string());

        match self {
            Category::Events => format!(
                "- {} ({}): {} at {}, organizer: {}, domain: {}",
                field("title"),
                field("type"),
                field("date"),
                field("location"),
                field("organizer"),
                field("domain"),
            ),
            Category::Fundraising => {
                // Older records carry the campaign name under `title`.
                let name = record
                    .display_field("campaignName")
                    .or_else(|| record.display_field("title"))
                    .unwrap_or_else(|| MISSING_FIELD.to_string());
                format!(
                    "- {}: raised {} of {}, organizer: {}",
                    name,
                    field("amountRaised"),
                    field("goal"),
                    field("organizer"),
                )
            }
            Category::Internships => format!(
                "- {} at {}: duration {}, stipend {}, posted by {}",
                field("title"),
                field("company"),
                field("duration"),
                field("stipend"),
                field("postedBy"),
            ),
        }
    }
}

/// One fetch of every collection, taken fresh per request and discarded
/// once the reply is produced.
#[derive(Debug, Clone, Default)]
pub struct CollectionSnapshot {
    pub events: Vec<Document>,
    pub fundraising: Vec<Document>,
    pub internships: Vec<Document>,
}

impl CollectionSnapshot {
    pub fn records(&self, category: Category) -> &[Document] {
        match category {
            Category::Events => &self.events,
            Category::Fundraising => &self.fundraising,
            Category::Internships => &self.internships,
        }
    }
}

/// Renders a collection snapshot into the text block handed to the model.
///
/// The output is a pure function of the snapshot: same records in, same
/// block out, with no influence from the user's question. A category with
/// zero records contributes nothing, not even its header.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    max_records_per_category: usize,
}

impl ContextBuilder {
    pub const DEFAULT_MAX_RECORDS: usize = 50;

    const MAX_RECORDS_VARS: [&'static str; 1] = ["ALUMNI_CONTEXT_MAX_RECORDS"];

    pub fn new(max_records_per_category: usize) -> Self {
        Self {
            max_records_per_category: max_records_per_category.max(1),
        }
    }

    pub fn from_env() -> Self {
        let max_records = Self::MAX_RECORDS_VARS
            .iter()
            .find_map(|key| env::var(key).ok())
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(Self::DEFAULT_MAX_RECORDS);
        Self::new(max_records)
    }

    pub fn build(&self, snapshot: &CollectionSnapshot) -> String {
        let mut block = String::from(PREAMBLE);

        for category in Category::ALL {
            let records = snapshot.records(category);
            if records.is_empty() {
                continue;
            }
            if records.len() > self.max_records_per_category {
                warn!(
                    category = category.collection(),
                    total = records.len(),
                    kept = self.max_records_per_category,
                    "Context truncated to record cap"
                );
            }

            block.push_str("\n\n");
            block.push_str(category.header());
            for record in records.iter().take(self.max_records_per_category) {
                block.push('\n');
                block.push_str(&category.render_line(record));
            }
        }

        block
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_RECORDS)
    }
}
