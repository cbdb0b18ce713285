//! Default schema scope guard.

use super::editor::SchemaEditor;
use std::ops::{Deref, DerefMut};

/// Switches an editor's default schema for the guard's lifetime.
///
/// The previous default schema is restored when the guard drops, including
/// on early return and unwinding.
pub struct SchemaScope<'a, E: SchemaEditor + ?Sized> {
    editor: &'a mut E,
    saved: Option<String>,
}

impl<'a, E: SchemaEditor + ?Sized> SchemaScope<'a, E> {
    /// Make `schema` the editor's default schema until the guard drops.
    pub fn enter(editor: &'a mut E, schema: String) -> Self {
        let saved = editor.default_schema_name().to_string();
        editor.set_default_schema_name(schema);
        Self {
            editor,
            saved: Some(saved),
        }
    }

    /// Schema that will be restored.
    pub fn saved_schema(&self) -> &str {
        self.saved.as_deref().unwrap_or_default()
    }
}

impl<E: SchemaEditor + ?Sized> Deref for SchemaScope<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.editor
    }
}

impl<E: SchemaEditor + ?Sized> DerefMut for SchemaScope<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.editor
    }
}

impl<E: SchemaEditor + ?Sized> Drop for SchemaScope<'_, E> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.editor.set_default_schema_name(saved);
        }
    }
}
