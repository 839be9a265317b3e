//! Field editors
//!
//! Each editor is bound to one path in a draft and turns user intent into a
//! single [`EditOperation`]. Editors check the permission gate themselves, so
//! a stale handler firing after a downgrade still cannot emit an edit.
//!
//! List rows are positional. Editors never take a captured row number;
//! they take a locator that is run against the draft's current items when
//! the operation is built.

use shipyard_core::prelude::*;
use shipyard_core::{can_edit, Config, EditOperation, FieldPath, FieldValue, Resource, User};

/// Everything an editor needs to decide and build an edit
#[derive(Debug, Clone, Copy)]
pub struct EditContext<'a> {
    pub user: &'a User,
    pub resource: &'a Resource,
    pub draft: &'a Config,
}

impl<'a> EditContext<'a> {
    pub fn new(user: &'a User, resource: &'a Resource, draft: &'a Config) -> Self {
        Self {
            user,
            resource,
            draft,
        }
    }

    pub fn can_edit(&self) -> bool {
        can_edit(self.user, self.resource)
    }

    fn ensure_editable(&self) -> Result<()> {
        if self.can_edit() {
            Ok(())
        } else {
            Err(Error::permission_denied(&self.resource.id))
        }
    }
}

/// Free-text field; emits on every change
#[derive(Debug, Clone, PartialEq)]
pub struct TextField {
    path: FieldPath,
}

impl TextField {
    pub fn new(path: FieldPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn value(&self, ctx: &EditContext<'_>) -> Result<String> {
        match ctx.draft.get(&self.path)? {
            FieldValue::Text(text) => Ok(text),
            other => Err(Error::type_mismatch(&self.path, "text", other.type_name())),
        }
    }

    pub fn change(&self, ctx: &EditContext<'_>, value: impl Into<String>) -> Result<EditOperation> {
        ctx.ensure_editable()?;
        Ok(EditOperation::set(self.path.clone(), FieldValue::Text(value.into())))
    }
}

/// Boolean switch
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleField {
    path: FieldPath,
}

impl ToggleField {
    pub fn new(path: FieldPath) -> Self {
        Self { path }
    }

    pub fn value(&self, ctx: &EditContext<'_>) -> Result<bool> {
        match ctx.draft.get(&self.path)? {
            FieldValue::Bool(on) => Ok(on),
            other => Err(Error::type_mismatch(&self.path, "bool", other.type_name())),
        }
    }

    pub fn set(&self, ctx: &EditContext<'_>, on: bool) -> Result<EditOperation> {
        ctx.ensure_editable()?;
        Ok(EditOperation::set(self.path.clone(), FieldValue::Bool(on)))
    }

    /// Flip the current draft value
    pub fn toggle(&self, ctx: &EditContext<'_>) -> Result<EditOperation> {
        let current = self.value(ctx)?;
        self.set(ctx, !current)
    }
}

/// Numeric input with inline range validation
#[derive(Debug, Clone, PartialEq)]
pub struct NumberField {
    path: FieldPath,
    min: f64,
    max: f64,
}

impl NumberField {
    pub fn new(path: FieldPath) -> Self {
        Self {
            path,
            min: f64::MIN,
            max: f64::MAX,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Percentage input (`0..=100`)
    pub fn percent(path: FieldPath) -> Self {
        Self::new(path).with_range(0.0, 100.0)
    }

    pub fn set(&self, ctx: &EditContext<'_>, value: f64) -> Result<EditOperation> {
        ctx.ensure_editable()?;
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(Error::invalid_value(
                &self.path,
                format!("{value} is outside {}..={}", self.min, self.max),
            ));
        }
        Ok(EditOperation::set(self.path.clone(), FieldValue::Number(value)))
    }

    /// Parse raw input text, reporting malformed numbers inline
    pub fn set_text(&self, ctx: &EditContext<'_>, raw: &str) -> Result<EditOperation> {
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::invalid_value(&self.path, format!("'{raw}' is not a number")))?;
        self.set(ctx, value)
    }
}

/// Ordered list of rows (ports, env, mounts, extra args, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct ListField {
    path: FieldPath,
    template: FieldValue,
}

impl ListField {
    /// Bind to `path` with an explicit default element for new rows
    pub fn new(path: FieldPath, template: FieldValue) -> Self {
        Self { path, template }
    }

    /// Bind to `path`, taking the empty element of the list's own type as default
    pub fn bound(config: &Config, path: FieldPath) -> Result<Self> {
        let template = config.empty_element(&path)?;
        Ok(Self::new(path, template))
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    pub fn items(&self, ctx: &EditContext<'_>) -> Result<Vec<FieldValue>> {
        ctx.draft.list_items(&self.path)
    }

    /// Add an empty row at the end
    pub fn append(&self, ctx: &EditContext<'_>) -> Result<EditOperation> {
        ctx.ensure_editable()?;
        let len = self.items(ctx)?.len();
        Ok(EditOperation::insert(self.path.clone(), len, self.template.clone()))
    }

    /// Add an empty row before the located row
    pub fn insert_before<F>(&self, ctx: &EditContext<'_>, locate: F) -> Result<EditOperation>
    where
        F: FnOnce(&[FieldValue]) -> Option<usize>,
    {
        ctx.ensure_editable()?;
        let index = self.resolve(ctx, locate)?;
        Ok(EditOperation::insert(self.path.clone(), index, self.template.clone()))
    }

    /// Remove the located row
    pub fn remove<F>(&self, ctx: &EditContext<'_>, locate: F) -> Result<EditOperation>
    where
        F: FnOnce(&[FieldValue]) -> Option<usize>,
    {
        ctx.ensure_editable()?;
        let index = self.resolve(ctx, locate)?;
        Ok(EditOperation::remove(self.path.clone(), index))
    }

    /// Replace the located row
    pub fn set_row<F>(&self, ctx: &EditContext<'_>, locate: F, value: FieldValue) -> Result<EditOperation>
    where
        F: FnOnce(&[FieldValue]) -> Option<usize>,
    {
        ctx.ensure_editable()?;
        let index = self.resolve(ctx, locate)?;
        Ok(EditOperation::set(self.path.clone().index(index), value))
    }

    /// Set one text sub-field (`local`, `container`, `variable`, ...) of the located row
    pub fn set_subfield<F>(
        &self,
        ctx: &EditContext<'_>,
        locate: F,
        subfield: &str,
        value: impl Into<String>,
    ) -> Result<EditOperation>
    where
        F: FnOnce(&[FieldValue]) -> Option<usize>,
    {
        ctx.ensure_editable()?;
        let index = self.resolve(ctx, locate)?;
        Ok(EditOperation::set(
            self.path.clone().index(index).key(subfield),
            FieldValue::Text(value.into()),
        ))
    }

    fn resolve<F>(&self, ctx: &EditContext<'_>, locate: F) -> Result<usize>
    where
        F: FnOnce(&[FieldValue]) -> Option<usize>,
    {
        let items = self.items(ctx)?;
        match locate(&items) {
            Some(index) if index < items.len() => Ok(index),
            Some(index) => Err(Error::index_out_of_range(&self.path, index, items.len())),
            None => Err(Error::invalid_path(&self.path, "row no longer present")),
        }
    }
}

/// Locator for the row at `index` in the current items
pub fn at(index: usize) -> impl FnOnce(&[FieldValue]) -> Option<usize> {
    move |items| (index < items.len()).then_some(index)
}

/// Locator for the first row equal to `row`
pub fn matching(row: &FieldValue) -> impl FnOnce(&[FieldValue]) -> Option<usize> + '_ {
    move |items| items.iter().position(|item| item == row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shipyard_api::test_utils::{test_deployment, test_server, test_user};
    use shipyard_core::{PermissionLevel, PortMapping};

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn test_text_field_emits_set() {
        let user = test_user("alice");
        let resource = test_deployment("dep-1", "web").with_permission("alice", PermissionLevel::Update);
        let ctx = EditContext::new(&user, &resource, &resource.config);

        let field = TextField::new(path("image"));
        assert_eq!(field.value(&ctx).unwrap(), "nginx");
        assert_eq!(
            field.change(&ctx, "redis").unwrap(),
            EditOperation::set(path("image"), FieldValue::text("redis"))
        );
    }

    #[test]
    fn test_editor_refuses_without_permission() {
        let user = test_user("bob");
        let resource = test_deployment("dep-1", "web").with_permission("bob", PermissionLevel::Execute);
        let ctx = EditContext::new(&user, &resource, &resource.config);

        assert!(!ctx.can_edit());
        let err = TextField::new(path("image")).change(&ctx, "x").unwrap_err();
        assert!(matches!(err, Error::PermissionDenied { .. }));

        let list = ListField::bound(&resource.config, path("ports")).unwrap();
        assert!(matches!(
            list.append(&ctx),
            Err(Error::PermissionDenied { .. })
        ));
    }

    #[test]
    fn test_toggle_reads_draft() {
        let admin = User::admin("root", "root");
        let resource = test_server("srv-1", "edge");
        let ctx = EditContext::new(&admin, &resource, &resource.config);

        let op = ToggleField::new(path("enabled")).toggle(&ctx).unwrap();
        assert_eq!(op, EditOperation::set(path("enabled"), FieldValue::Bool(false)));
    }

    #[test]
    fn test_number_field_inline_validation() {
        let admin = User::admin("root", "root");
        let resource = test_server("srv-1", "edge");
        let ctx = EditContext::new(&admin, &resource, &resource.config);
        let field = NumberField::percent(path("cpu_alert"));

        assert!(field.set(&ctx, 80.0).is_ok());
        assert!(matches!(field.set(&ctx, 101.0), Err(Error::InvalidValue { .. })));
        assert!(matches!(field.set_text(&ctx, "abc"), Err(Error::InvalidValue { .. })));
        assert_eq!(
            field.set_text(&ctx, " 42 ").unwrap(),
            EditOperation::set(path("cpu_alert"), FieldValue::Number(42.0))
        );
    }

    #[test]
    fn test_list_append_uses_live_length() {
        let admin = User::admin("root", "root");
        let resource = test_deployment("dep-1", "web");
        let ctx = EditContext::new(&admin, &resource, &resource.config);
        let list = ListField::bound(&resource.config, path("ports")).unwrap();

        assert_eq!(
            list.append(&ctx).unwrap(),
            EditOperation::insert(path("ports"), 1, FieldValue::Port(PortMapping::default()))
        );
    }

    #[test]
    fn test_locator_resolves_against_current_rows() {
        let admin = User::admin("root", "root");
        let resource = test_deployment("dep-1", "web");
        let mut draft = resource.config.clone();
        let https = FieldValue::Port(PortMapping::new("443", "8443"));
        EditOperation::insert(path("ports"), 0, https.clone())
            .apply(&mut draft)
            .unwrap();

        // the row that was at 0 when rendered now sits at 1
        let list = ListField::bound(&draft, path("ports")).unwrap();
        let ctx = EditContext::new(&admin, &resource, &draft);
        let http = FieldValue::Port(PortMapping::new("80", "8080"));
        assert_eq!(
            list.remove(&ctx, matching(&http)).unwrap(),
            EditOperation::remove(path("ports"), 1)
        );
        assert_eq!(
            list.set_subfield(&ctx, matching(&https), "local", "4443").unwrap(),
            EditOperation::set(path("ports[0].local"), FieldValue::text("4443"))
        );
    }

    #[test]
    fn test_vanished_row_is_reported() {
        let admin = User::admin("root", "root");
        let resource = test_deployment("dep-1", "web");
        let ctx = EditContext::new(&admin, &resource, &resource.config);
        let list = ListField::bound(&resource.config, path("ports")).unwrap();

        let gone = FieldValue::Port(PortMapping::new("1", "1"));
        assert!(matches!(
            list.remove(&ctx, matching(&gone)),
            Err(Error::InvalidPath { .. })
        ));
        assert!(matches!(
            list.remove(&ctx, at(5)),
            Err(Error::InvalidPath { .. })
        ));
    }
}
