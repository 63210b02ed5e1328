use loom_model::TaskConfig;

/// How a changed field is applied to a running group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldClass {
    /// Takes effect immediately.
    Live,
    /// Running processes must be restarted to pick it up.
    Restart,
    /// The file-watch subscription must be rebuilt.
    Resubscribe,
}

pub(crate) struct FieldRule {
    pub name: &'static str,
    pub class: FieldClass,
    pub changed: fn(&TaskConfig, &TaskConfig) -> bool,
    pub apply: fn(&mut TaskConfig, &TaskConfig),
}

macro_rules! field {
    ($field:ident, $class:ident) => {
        FieldRule {
            name: stringify!($field),
            class: FieldClass::$class,
            changed: |cur: &TaskConfig, new: &TaskConfig| cur.$field != new.$field,
            apply: |cur: &mut TaskConfig, new: &TaskConfig| cur.$field = new.$field.clone(),
        }
    };
}

/// Every reconcilable field of a task group. `name` is the identity and
/// never changes.
pub(crate) static FIELDS: &[FieldRule] = &[
    field!(count, Live),
    field!(persistent, Live),
    field!(timeout_ms, Live),
    field!(runtime_ms, Live),
    field!(watch, Resubscribe),
    field!(source, Restart),
    field!(executable, Restart),
    field!(cwd, Restart),
    field!(env, Restart),
    field!(arguments, Restart),
];

/// Outcome of folding a new parameter set into the current one.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Diff {
    pub restart: bool,
    pub resubscribe: bool,
}

/// Apply `new` onto `cur` field by field and report what has to follow.
pub(crate) fn reconcile(cur: &mut TaskConfig, new: &TaskConfig) -> Diff {
    let mut diff = Diff::default();
    for rule in FIELDS {
        if !(rule.changed)(cur, new) {
            continue;
        }
        tracing::debug!(target: "loom.core", group = %cur.name, field = rule.name, class = ?rule.class, "field changed");
        match rule.class {
            FieldClass::Live => {}
            FieldClass::Restart => diff.restart = true,
            FieldClass::Resubscribe => diff.resubscribe = true,
        }
        (rule.apply)(cur, new);
    }
    diff
}
