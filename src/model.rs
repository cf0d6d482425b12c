use std::collections::HashMap;
use std::fmt;

/// Code point the marker format writes for the terminator: `Þ`, U+00DE.
pub const TERMINATOR_CODE: u32 = 0xDE;

/// One entry of the coding alphabet.
///
/// Input bytes are read as the code points `0..=255`. The terminator is a separate variant so
/// it can never be confused with input in memory; only a wire format that squeezes it into a
/// byte can make it collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    Byte(u8),
    Terminator,
}

impl Symbol {
    /// Code point as stored in the framed format's `u32` symbol field.
    pub fn code_point(self) -> u32 {
        match self {
            Symbol::Byte(b) => u32::from(b),
            Symbol::Terminator => TERMINATOR_CODE,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Byte(b) if b.is_ascii_graphic() => write!(f, "'{}'", *b as char),
            Symbol::Byte(b) => write!(f, "{b:#04x}"),
            Symbol::Terminator => f.write_str("<end>"),
        }
    }
}

/// Input bytes as symbols, with the terminator appended when asked for.
pub fn augmented(data: &[u8], terminator: bool) -> impl Iterator<Item = Symbol> + '_ {
    data.iter()
        .map(|&b| Symbol::Byte(b))
        .chain(terminator.then_some(Symbol::Terminator))
}

/// Occurrence counts per distinct symbol, in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyModel {
    counts: Vec<(Symbol, u64)>,
}

impl FrequencyModel {
    /// Counts `data`, optionally with one terminator appended at the end.
    pub fn count(data: &[u8], terminator: bool) -> Self {
        let mut index: HashMap<Symbol, usize> = HashMap::new();
        let mut counts: Vec<(Symbol, u64)> = Vec::new();
        for symbol in augmented(data, terminator) {
            let slot = *index.entry(symbol).or_insert_with(|| {
                counts.push((symbol, 0));
                counts.len() - 1
            });
            counts[slot].1 += 1;
        }
        FrequencyModel { counts }
    }

    /// `(symbol, weight)` pairs in the order the symbols first appeared.
    pub fn entries(&self) -> &[(Symbol, u64)] {
        &self.counts
    }

    pub fn weight(&self, symbol: Symbol) -> Option<u64> {
        self.counts
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|&(_, w)| w)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of symbols counted, terminator included.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&(_, w)| w).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_in_first_occurrence_order() {
        let model = FrequencyModel::count(b"aaab", true);
        assert_eq!(
            model.entries(),
            &[
                (Symbol::Byte(b'a'), 3),
                (Symbol::Byte(b'b'), 1),
                (Symbol::Terminator, 1)
            ]
        );
        assert_eq!(model.total(), 5);
    }

    #[test]
    fn order_follows_first_sighting_not_value() {
        let model = FrequencyModel::count(b"zyzx", false);
        let order: Vec<Symbol> = model.entries().iter().map(|&(s, _)| s).collect();
        assert_eq!(
            order,
            vec![Symbol::Byte(b'z'), Symbol::Byte(b'y'), Symbol::Byte(b'x')]
        );
        assert_eq!(model.weight(Symbol::Byte(b'z')), Some(2));
        assert_eq!(model.weight(Symbol::Terminator), None);
    }

    #[test]
    fn empty_input_has_only_the_terminator() {
        assert!(FrequencyModel::count(b"", false).is_empty());
        let model = FrequencyModel::count(b"", true);
        assert_eq!(model.entries(), &[(Symbol::Terminator, 1)]);
    }

    #[test]
    fn terminator_byte_value_is_still_a_byte() {
        let model = FrequencyModel::count(&[0xDE], true);
        assert_eq!(model.len(), 2);
        assert_eq!(Symbol::Byte(0xDE).code_point(), Symbol::Terminator.code_point());
        assert_ne!(Symbol::Byte(0xDE), Symbol::Terminator);
    }
}
