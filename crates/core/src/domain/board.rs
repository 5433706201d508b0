// Operator-facing grouping of queue entries

use crate::domain::entry::QueueEntry;
use serde::Serialize;

/// Entries of one category, in arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub entries: Vec<QueueEntry>,
}

impl CategoryGroup {
    pub fn waiting(&self) -> usize {
        self.entries.iter().filter(|e| !e.served).count()
    }

    pub fn served(&self) -> usize {
        self.entries.len() - self.waiting()
    }
}

/// All entries grouped by category.
///
/// Groups appear in the order their first entry arrived; entries keep the
/// snapshot's arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryBoard {
    groups: Vec<CategoryGroup>,
}

impl CategoryBoard {
    /// Group an arrival-ordered snapshot
    pub fn from_snapshot(entries: &[QueueEntry]) -> Self {
        let mut groups: Vec<CategoryGroup> = Vec::new();
        for entry in entries {
            match groups.iter_mut().find(|g| g.category == entry.category) {
                Some(group) => group.entries.push(entry.clone()),
                None => groups.push(CategoryGroup {
                    category: entry.category.clone(),
                    entries: vec![entry.clone()],
                }),
            }
        }
        Self { groups }
    }

    pub fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }

    pub fn get(&self, category: &str) -> Option<&CategoryGroup> {
        self.groups.iter().find(|g| g.category == category)
    }

    pub fn find_entry(&self, entry_id: &str) -> Option<&QueueEntry> {
        self.groups
            .iter()
            .flat_map(|g| g.entries.iter())
            .find(|e| e.id == entry_id)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OperatorId;

    #[test]
    fn test_grouping_preserves_arrival_order() {
        let snapshot = vec![
            QueueEntry::new("a", "Ann", "Support", 1, ""),
            QueueEntry::new("b", "Ben", "Billing", 2, ""),
            QueueEntry::new("c", "Cat", "Support", 3, ""),
            QueueEntry::new("d", "Dan", "Billing", 4, ""),
        ];
        let board = CategoryBoard::from_snapshot(&snapshot);

        let categories: Vec<&str> = board.groups().iter().map(|g| g.category.as_str()).collect();
        assert_eq!(categories, vec!["Support", "Billing"]);

        let support: Vec<&str> = board
            .get("Support")
            .unwrap()
            .entries
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(support, vec!["a", "c"]);
        assert_eq!(board.len(), 4);
    }

    #[test]
    fn test_group_counts() {
        let mut served = QueueEntry::new("a", "Ann", "Billing", 1, "");
        served.accept(&OperatorId::new("op")).unwrap();
        let board =
            CategoryBoard::from_snapshot(&[served, QueueEntry::new("b", "Ben", "Billing", 2, "")]);

        let group = board.get("Billing").unwrap();
        assert_eq!(group.waiting(), 1);
        assert_eq!(group.served(), 1);
        assert!(board.find_entry("a").unwrap().served);
    }

    #[test]
    fn test_empty_board() {
        let board = CategoryBoard::from_snapshot(&[]);
        assert!(board.is_empty());
        assert!(board.get("Billing").is_none());
    }
}
