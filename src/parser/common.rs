// Tree-sitter helpers shared by the Go frontend

use tree_sitter::Node;

/// Extract text from a node
pub fn node_text<'a>(node: Node<'a>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Find all children of a specific kind
pub fn children_of_kind<'a>(node: Node<'a>, kind: &str) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.children(&mut cursor)
        .filter(|child| child.kind() == kind)
        .collect()
}

/// Whether a node has an anonymous child token with the given text (e.g. `*`, `(`)
pub fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

/// Go export rule: the first character is an upper-case letter
pub fn is_exported(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

/// Documentation attached to a node: the contiguous run of comments that ends
/// on the line directly above it.
///
/// A comment sharing its first line with the previous sibling is that sibling's
/// trailing comment and ends the run. Newline terminators are sibling tokens
/// in the Go grammar; a comment after one always starts its own line.
pub fn doc_comment(node: Node, source: &str) -> String {
    let mut lines: Vec<Node> = Vec::new();
    let mut next_row = node.start_position().row;
    let mut current = node.prev_sibling();

    while let Some(prev) = current {
        if prev.kind() != "comment" || prev.end_position().row + 1 != next_row {
            break;
        }
        if let Some(before) = prev.prev_sibling() {
            if before.kind() != "\n" && before.end_position().row == prev.start_position().row {
                break;
            }
        }
        next_row = prev.start_position().row;
        lines.push(prev);
        current = prev.prev_sibling();
    }

    lines.reverse();
    clean_comments(lines.iter().map(|c| node_text(*c, source)))
}

/// Strip comment markers and directives (`//go:generate ...`), keep the text
fn clean_comments<'a>(comments: impl Iterator<Item = &'a str>) -> String {
    let mut out: Vec<&str> = Vec::new();

    for comment in comments {
        if let Some(line) = comment.strip_prefix("//") {
            if is_directive(line) {
                continue;
            }
            out.push(line.strip_prefix(' ').unwrap_or(line).trim_end());
        } else if let Some(block) = comment
            .strip_prefix("/*")
            .and_then(|c| c.strip_suffix("*/"))
        {
            out.extend(block.lines().map(str::trim));
        }
    }

    out.join("\n").trim().to_string()
}

/// `//go:generate`, `//nolint:foo`, `//export:x`: no space, lowercase word, colon
fn is_directive(line: &str) -> bool {
    match line.split_once(':') {
        Some((word, rest)) => {
            !word.is_empty()
                && !rest.is_empty()
                && word.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        }
        None => false,
    }
}

/// Iterator over all descendant nodes
pub fn descendants(node: Node) -> impl Iterator<Item = Node> {
    DescendantIterator::new(node)
}

struct DescendantIterator<'a> {
    cursor: tree_sitter::TreeCursor<'a>,
    done: bool,
}

impl<'a> DescendantIterator<'a> {
    fn new(node: Node<'a>) -> Self {
        Self {
            cursor: node.walk(),
            done: false,
        }
    }
}

impl<'a> Iterator for DescendantIterator<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let node = self.cursor.node();

        // Try to go to first child
        if self.cursor.goto_first_child() {
            return Some(node);
        }

        // Try to go to next sibling
        loop {
            if self.cursor.goto_next_sibling() {
                return Some(node);
            }

            // Go up to parent
            if !self.cursor.goto_parent() {
                self.done = true;
                return Some(node);
            }
        }
    }
}
