//! Category assignment strategies for persona slots.

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

/// Chooses the category bound to a persona slot.
pub trait CategoryAssigner {
    /// Returns the category for `slot` (numbered from 1), or None to leave it unassigned.
    ///
    /// `available` is the sorted list of categories found in the corpus.
    fn choose_category(&mut self, slot: usize, available: &[String]) -> Option<String>;
}

/// Looks the slot up in a fixed table.
///
/// An exact name wins; otherwise the first available category containing
/// the table entry is used.
#[derive(Debug, Clone, Default)]
pub struct DefaultTableAssigner {
    table: BTreeMap<usize, String>,
}

impl DefaultTableAssigner {
    /// Creates an assigner over a slot → category table.
    pub fn new(table: BTreeMap<usize, String>) -> Self {
        Self { table }
    }
}

impl CategoryAssigner for DefaultTableAssigner {
    fn choose_category(&mut self, slot: usize, available: &[String]) -> Option<String> {
        let wanted = self.table.get(&slot)?;
        available
            .iter()
            .find(|c| *c == wanted)
            .or_else(|| available.iter().find(|c| c.contains(wanted.as_str())))
            .cloned()
    }
}

/// Slot N takes the N-th category in sorted order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalAssigner;

impl CategoryAssigner for PositionalAssigner {
    fn choose_category(&mut self, slot: usize, available: &[String]) -> Option<String> {
        slot.checked_sub(1).and_then(|i| available.get(i)).cloned()
    }
}

/// Asks on a terminal (or any reader/writer pair).
///
/// Accepts a list number or a category name. An empty line or end of input
/// leaves the slot to the next strategy.
pub struct InteractiveAssigner<R, W> {
    input: R,
    output: W,
    listed: bool,
}

impl<R: BufRead, W: Write> InteractiveAssigner<R, W> {
    /// Creates an assigner reading answers from `input` and writing prompts to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            listed: false,
        }
    }

    fn list(&mut self, available: &[String]) -> std::io::Result<()> {
        writeln!(self.output, "Available categories:")?;
        for (i, category) in available.iter().enumerate() {
            writeln!(self.output, "  {:>2}) {}", i + 1, category)?;
        }
        Ok(())
    }

    fn ask(&mut self, slot: usize, available: &[String]) -> std::io::Result<Option<String>> {
        if !self.listed {
            self.list(available)?;
            self.listed = true;
        }

        loop {
            write!(self.output, "Persona {} category (number or name, empty to skip): ", slot)?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            let answer = line.trim();
            if answer.is_empty() {
                return Ok(None);
            }

            let chosen = match answer.parse::<usize>() {
                Ok(n) => n.checked_sub(1).and_then(|i| available.get(i)),
                Err(_) => available.iter().find(|c| c.as_str() == answer),
            };
            match chosen {
                Some(category) => return Ok(Some(category.clone())),
                None => writeln!(self.output, "No category {:?}", answer)?,
            }
        }
    }
}

impl<R: BufRead, W: Write> CategoryAssigner for InteractiveAssigner<R, W> {
    fn choose_category(&mut self, slot: usize, available: &[String]) -> Option<String> {
        if available.is_empty() {
            return None;
        }
        self.ask(slot, available).ok().flatten()
    }
}

/// Tries each strategy in order until one answers.
#[derive(Default)]
pub struct ChainAssigner {
    strategies: Vec<Box<dyn CategoryAssigner>>,
}

impl ChainAssigner {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy.
    pub fn then(mut self, strategy: impl CategoryAssigner + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }
}

impl CategoryAssigner for ChainAssigner {
    fn choose_category(&mut self, slot: usize, available: &[String]) -> Option<String> {
        self.strategies
            .iter_mut()
            .find_map(|s| s.choose_category(slot, available))
    }
}
