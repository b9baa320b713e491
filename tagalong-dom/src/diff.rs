/// One attribute change against the last applied attribute list.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrPatch {
    Set(String, String),
    Remove(String),
}

/// Patches that turn `old` into `new`: sets for new and changed names, in
/// `new`'s order, then removals for names `new` no longer carries.
pub fn diff_attrs(old: &[(String, String)], new: &[(String, String)]) -> Vec<AttrPatch> {
    let mut patches = Vec::new();
    // Values equal to the last pass cost nothing.
    for (k, v_new) in new {
        match old.iter().find(|(name, _)| name == k) {
            Some((_, v_old)) if v_old == v_new => {}
            _ => patches.push(AttrPatch::Set(k.clone(), v_new.clone())),
        }
    }
    for (k, _) in old {
        if !new.iter().any(|(name, _)| name == k) {
            patches.push(AttrPatch::Remove(k.clone()));
        }
    }
    patches
}
