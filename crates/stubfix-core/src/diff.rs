//! Unified diff generation.
//!
//! Produces the same line sequence as Python's
//! `difflib.unified_diff(a, b, fromfile, tofile, n=context, lineterm="")`:
//! `---`/`+++` headers, `@@ -start,len +start,len @@` hunk headers, and
//! hunks merged when at most `2 * context` unchanged lines separate them.
//! Lines are aligned the way `difflib.SequenceMatcher` aligns them: the
//! longest matching block first, then recursively on both sides, with
//! lines that are too frequent in a long `b` ignored as anchors.

use std::collections::{HashMap, HashSet};

/// Kind of an edit operation over line ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// An edit operation: `a[i1..i2]` becomes `b[j1..j2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Opcode {
    tag: Tag,
    i1: usize,
    i2: usize,
    j1: usize,
    j2: usize,
}

/// `b` needs at least this many lines before frequent lines stop anchoring.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Line matcher over two line sequences.
struct SequenceMatcher<'a> {
    a: &'a [&'a str],
    b: &'a [&'a str],
    /// Positions of each line of `b`, minus the popular ones.
    b2j: HashMap<&'a str, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [&'a str], b: &'a [&'a str]) -> Self {
        let mut b2j: HashMap<&'a str, Vec<usize>> = HashMap::new();
        for (j, line) in b.iter().enumerate() {
            b2j.entry(*line).or_default().push(j);
        }
        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            let popular: HashSet<&str> = b2j
                .iter()
                .filter(|(_, positions)| positions.len() > limit)
                .map(|(line, _)| *line)
                .collect();
            b2j.retain(|line, _| !popular.contains(line));
        }
        SequenceMatcher { a, b, b2j }
    }

    /// Longest block `a[i..i+k] == b[j..j+k]` inside the given ranges,
    /// earliest in `a` (then in `b`) on ties.
    fn find_longest_match(
        &self,
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = next;
        }

        // Popular lines never anchor a match but may extend one.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }
        (besti, bestj, bestsize)
    }

    /// Matching blocks sorted by position, adjacent blocks merged, ending
    /// with the `(len(a), len(b), 0)` sentinel.
    fn matching_blocks(&self) -> Vec<(usize, usize, usize)> {
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();
        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            blocks.push((i, j, k));
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }
        blocks.sort_unstable();

        let mut merged: Vec<(usize, usize, usize)> = Vec::with_capacity(blocks.len() + 1);
        for (i, j, k) in blocks {
            match merged.last_mut() {
                Some(last) if last.0 + last.2 == i && last.1 + last.2 == j => last.2 += k,
                _ => merged.push((i, j, k)),
            }
        }
        merged.push((self.a.len(), self.b.len(), 0));
        merged
    }

    fn opcodes(&self) -> Vec<Opcode> {
        let mut ops = Vec::new();
        let (mut i, mut j) = (0, 0);
        for (ai, bj, size) in self.matching_blocks() {
            let tag = match (i < ai, j < bj) {
                (true, true) => Some(Tag::Replace),
                (true, false) => Some(Tag::Delete),
                (false, true) => Some(Tag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                ops.push(Opcode {
                    tag,
                    i1: i,
                    i2: ai,
                    j1: j,
                    j2: bj,
                });
            }
            i = ai + size;
            j = bj + size;
            if size > 0 {
                ops.push(Opcode {
                    tag: Tag::Equal,
                    i1: ai,
                    i2: i,
                    j1: bj,
                    j2: j,
                });
            }
        }
        ops
    }
}

/// Group edit operations into hunks with `context` lines around changes.
fn grouped_opcodes(mut codes: Vec<Opcode>, context: usize) -> Vec<Vec<Opcode>> {
    if codes.is_empty() {
        codes.push(Opcode {
            tag: Tag::Equal,
            i1: 0,
            i2: 1,
            j1: 0,
            j2: 1,
        });
    }

    // Trim leading and trailing unchanged runs down to the context size.
    if let Some(first) = codes.first_mut() {
        if first.tag == Tag::Equal {
            first.i1 = first.i1.max(first.i2.saturating_sub(context));
            first.j1 = first.j1.max(first.j2.saturating_sub(context));
        }
    }
    if let Some(last) = codes.last_mut() {
        if last.tag == Tag::Equal {
            last.i2 = last.i2.min(last.i1 + context);
            last.j2 = last.j2.min(last.j1 + context);
        }
    }

    let mut groups = Vec::new();
    let mut group = Vec::new();
    for code in codes {
        let mut code = code;
        if code.tag == Tag::Equal && code.i2 - code.i1 > 2 * context {
            group.push(Opcode {
                i2: code.i2.min(code.i1 + context),
                j2: code.j2.min(code.j1 + context),
                ..code
            });
            groups.push(std::mem::take(&mut group));
            code.i1 = code.i1.max(code.i2.saturating_sub(context));
            code.j1 = code.j1.max(code.j2.saturating_sub(context));
        }
        group.push(code);
    }
    if !group.is_empty() && !(group.len() == 1 && group[0].tag == Tag::Equal) {
        groups.push(group);
    }

    // A leading group made only of trimmed context carries no change.
    groups.retain(|g| g.iter().any(|op| op.tag != Tag::Equal));
    groups
}

/// Format a hunk range the way `difflib` does.
fn format_range(start: usize, stop: usize) -> String {
    let mut beginning = start + 1;
    let length = stop - start;
    if length == 1 {
        return beginning.to_string();
    }
    if length == 0 {
        beginning -= 1;
    }
    format!("{},{}", beginning, length)
}

/// Generate unified diff lines between two texts.
///
/// Both texts are split into lines without their terminators. Returns an
/// empty vector when the texts have identical lines.
pub fn unified_diff(
    original: &str,
    modified: &str,
    from_label: &str,
    to_label: &str,
    context: usize,
) -> Vec<String> {
    let a: Vec<&str> = original.lines().collect();
    let b: Vec<&str> = modified.lines().collect();

    let mut out = Vec::new();
    for group in grouped_opcodes(SequenceMatcher::new(&a, &b).opcodes(), context) {
        if out.is_empty() {
            out.push(format!("--- {}", from_label));
            out.push(format!("+++ {}", to_label));
        }
        let (first, last) = (group[0], group[group.len() - 1]);
        out.push(format!(
            "@@ -{} +{} @@",
            format_range(first.i1, last.i2),
            format_range(first.j1, last.j2)
        ));
        for op in &group {
            if op.tag == Tag::Equal {
                out.extend(a[op.i1..op.i2].iter().map(|line| format!(" {}", line)));
                continue;
            }
            if matches!(op.tag, Tag::Replace | Tag::Delete) {
                out.extend(a[op.i1..op.i2].iter().map(|line| format!("-{}", line)));
            }
            if matches!(op.tag, Tag::Replace | Tag::Insert) {
                out.extend(b[op.j1..op.j2].iter().map(|line| format!("+{}", line)));
            }
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_produce_no_diff() {
        let text = "import os\nx: int\n";
        assert!(unified_diff(text, text, "a.pyi", "a.pyi", 1).is_empty());
    }

    #[test]
    fn empty_texts_produce_no_diff() {
        assert!(unified_diff("", "", "a.pyi", "a.pyi", 1).is_empty());
    }

    #[test]
    fn single_line_change_with_one_line_of_context() {
        let a = "import os\nx: int\ny: str\nz: float";
        let b = "import os\nx: int\ny: bytes\nz: float";
        let diff = unified_diff(a, b, "f3d/pyf3d.pyi", "f3d/pyf3d.pyi", 1);
        assert_eq!(
            diff,
            vec![
                "--- f3d/pyf3d.pyi",
                "+++ f3d/pyf3d.pyi",
                "@@ -2,3 +2,3 @@",
                " x: int",
                "-y: str",
                "+y: bytes",
                " z: float",
            ]
        );
    }

    #[test]
    fn change_on_first_line_has_no_leading_context() {
        let diff = unified_diff("a\nb\nc", "A\nb\nc", "f", "f", 1);
        assert_eq!(diff, vec!["--- f", "+++ f", "@@ -1,2 +1,2 @@", "-a", "+A", " b"]);
    }

    #[test]
    fn distant_changes_produce_separate_hunks() {
        let a = "1\n2\n3\n4\n5\n6\n7\n8";
        let b = "one\n2\n3\n4\n5\n6\n7\neight";
        let diff = unified_diff(a, b, "f", "f", 1);
        assert_eq!(
            diff,
            vec![
                "--- f",
                "+++ f",
                "@@ -1,2 +1,2 @@",
                "-1",
                "+one",
                " 2",
                "@@ -7,2 +7,2 @@",
                " 7",
                "-8",
                "+eight",
            ]
        );
    }

    #[test]
    fn nearby_changes_share_a_hunk() {
        let a = "1\n2\n3\n4\n5";
        let b = "1\nTWO\n3\nFOUR\n5";
        let diff = unified_diff(a, b, "f", "f", 1);
        assert_eq!(
            diff,
            vec![
                "--- f", "+++ f", "@@ -1,5 +1,5 @@", " 1", "-2", "+TWO", " 3", "-4", "+FOUR",
                " 5",
            ]
        );
    }

    #[test]
    fn pure_insertion_reports_single_line_ranges() {
        let diff = unified_diff("a\nc", "a\nb\nc", "f", "f", 1);
        assert_eq!(diff, vec!["--- f", "+++ f", "@@ -1,2 +1,3 @@", " a", "+b", " c"]);
    }

    #[test]
    fn insertion_into_empty_text() {
        let diff = unified_diff("", "import os", "f", "f", 1);
        assert_eq!(diff, vec!["--- f", "+++ f", "@@ -0,0 +1 @@", "+import os"]);
    }

    #[test]
    fn alignment_anchors_on_the_longest_matching_block() {
        // difflib.unified_diff(a, b, "f", "f", n=1, lineterm="")
        let a = "e\nc\na\na\na\na\nd\na\nc\nb\nc\na";
        let b = "e\nc\na\nd\nd\na\nc\nb\nc\na";
        let diff = unified_diff(a, b, "f", "f", 1);
        assert_eq!(
            diff,
            vec!["--- f", "+++ f", "@@ -3,5 +3,3 @@", " a", "-a", "-a", "-a", "+d", " d"]
        );
    }

    #[test]
    fn matching_blocks_are_merged_and_terminated() {
        let a = ["x", "a", "b", "y"];
        let b = ["a", "b", "z"];
        let matcher = SequenceMatcher::new(&a, &b);
        assert_eq!(matcher.matching_blocks(), vec![(1, 0, 2), (4, 3, 0)]);
        let tags: Vec<Tag> = matcher.opcodes().iter().map(|op| op.tag).collect();
        assert_eq!(tags, vec![Tag::Delete, Tag::Equal, Tag::Replace]);
    }

    #[test]
    fn format_range_matches_difflib() {
        assert_eq!(format_range(0, 1), "1");
        assert_eq!(format_range(2, 5), "3,3");
        assert_eq!(format_range(3, 3), "3,0");
        assert_eq!(format_range(0, 0), "0,0");
    }
}
