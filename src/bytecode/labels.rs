use std::collections::HashMap;

use crate::bytecode::op::WsAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelState {
    Resolved(WsAddr),
    /// Bytecode offsets of address operands waiting for the definition.
    Pending(Vec<usize>),
}

/// Result of compiling a label definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    /// First sighting of the name.
    Fresh,
    /// The name had forward references; these sites must now be patched.
    Patch(Vec<usize>),
    /// Already defined; the original address is kept.
    Duplicate(WsAddr),
}

/// Label name → address or pending patch sites, for one compilation.
#[derive(Debug, Default)]
pub struct LabelTable {
    entries: HashMap<String, LabelState>,
}

impl LabelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, addr: WsAddr) -> Definition {
        if let Some(LabelState::Resolved(first)) = self.entries.get(name) {
            return Definition::Duplicate(*first);
        }
        match self
            .entries
            .insert(name.to_string(), LabelState::Resolved(addr))
        {
            Some(LabelState::Pending(sites)) => Definition::Patch(sites),
            _ => Definition::Fresh,
        }
    }

    /// Returns the address if known, otherwise records `site` for later.
    pub fn reference(&mut self, name: &str, site: usize) -> Option<WsAddr> {
        match self.entries.get_mut(name) {
            Some(LabelState::Resolved(addr)) => Some(*addr),
            Some(LabelState::Pending(sites)) => {
                sites.push(site);
                None
            }
            None => {
                self.entries
                    .insert(name.to_string(), LabelState::Pending(vec![site]));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&LabelState> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Splits the table into resolved addresses and still-pending names,
    /// consuming it.
    pub fn finish(self) -> (Vec<(String, WsAddr)>, Vec<(String, Vec<usize>)>) {
        let mut resolved = Vec::new();
        let mut pending = Vec::new();
        for (name, state) in self.entries {
            match state {
                LabelState::Resolved(addr) => resolved.push((name, addr)),
                LabelState::Pending(sites) => pending.push((name, sites)),
            }
        }
        pending.sort();
        (resolved, pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_fresh() {
        let mut t = LabelTable::new();
        assert_eq!(t.define("S", 10), Definition::Fresh);
        assert_eq!(t.get("S"), Some(&LabelState::Resolved(10)));
    }

    #[test]
    fn test_backward_reference_resolves_inline() {
        let mut t = LabelTable::new();
        t.define("ST", 4);
        assert_eq!(t.reference("ST", 20), Some(4));
    }

    #[test]
    fn test_forward_references_collect_sites() {
        let mut t = LabelTable::new();
        assert_eq!(t.reference("T", 1), None);
        assert_eq!(t.reference("T", 9), None);
        assert_eq!(t.get("T"), Some(&LabelState::Pending(vec![1, 9])));
        assert_eq!(t.define("T", 30), Definition::Patch(vec![1, 9]));
        assert_eq!(t.get("T"), Some(&LabelState::Resolved(30)));
        // later references see the address
        assert_eq!(t.reference("T", 40), Some(30));
    }

    #[test]
    fn test_duplicate_keeps_first_address() {
        let mut t = LabelTable::new();
        t.define("S", 3);
        assert_eq!(t.define("S", 99), Definition::Duplicate(3));
        assert_eq!(t.get("S"), Some(&LabelState::Resolved(3)));
    }

    #[test]
    fn test_name_appears_once() {
        let mut t = LabelTable::new();
        t.reference("S", 0);
        t.define("S", 5);
        t.reference("S", 8);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_finish_splits_states() {
        let mut t = LabelTable::new();
        t.define("S", 2);
        t.reference("TT", 7);
        let (resolved, pending) = t.finish();
        assert_eq!(resolved, vec![("S".to_string(), 2)]);
        assert_eq!(pending, vec![("TT".to_string(), vec![7])]);
    }
}
