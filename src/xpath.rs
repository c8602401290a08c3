use ego_tree::NodeRef;
use scraper::Node;

/// Positional fingerprint of a node: /html[1]/body[1]/a[3].
///
/// Ranks are 1-based and count only preceding siblings with the same tag
/// name, so two derivations over the same tree always agree. Used as a
/// diagnostic locator in serialized lines, never as a merge key.
pub fn derive_path(node: NodeRef<'_, Node>) -> String {
    let mut components = Vec::new();

    // Text nodes carry no tag of their own; start the walk at the parent.
    let mut current = if node.value().is_element() {
        Some(node)
    } else {
        node.parent()
    };

    while let Some(n) = current {
        let Some(element) = n.value().as_element() else {
            // Document root (or detached subtree): the walk is done.
            break;
        };
        let rank = 1 + n
            .prev_siblings()
            .filter(|sib| {
                sib.value()
                    .as_element()
                    .is_some_and(|e| e.name() == element.name())
            })
            .count();
        components.push(format!("{}[{}]", element.name(), rank));
        current = n.parent();
    }

    components.reverse();
    format!("/{}", components.join("/"))
}
