use crate::{
    launcher::{ProcessSpawner, SystemSpawner},
    library::{ModFields, ModPath, ModRecord},
    query::{CategoryFilter, Listing, ModQuery},
    session::Session,
};
use anyhow::Result;
use arboard::Clipboard;
use std::time::{Duration, Instant};

const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPurpose {
    FilterName,
    BaseFolder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing {
        prompt: String,
        buffer: String,
        purpose: InputPurpose,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    DeleteMod { id: i64, name: String },
}

#[derive(Debug, Clone)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    pub yes_label: String,
    pub no_label: String,
    pub choice: DialogChoice,
    pub kind: DialogKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Version,
    Category,
    Cover,
    Script,
    Blend,
    WorkFolder,
}

impl FormField {
    pub const ALL: [FormField; 7] = [
        FormField::Name,
        FormField::Version,
        FormField::Category,
        FormField::Cover,
        FormField::Script,
        FormField::Blend,
        FormField::WorkFolder,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Name => "Name",
            FormField::Version => "Version",
            FormField::Category => "Category",
            FormField::Cover => "Cover image",
            FormField::Script => "Script",
            FormField::Blend => "Blend file",
            FormField::WorkFolder => "Project folder",
        }
    }
}

/// The add/edit editor. Status and last run are carried through untouched.
#[derive(Debug, Clone)]
pub struct ModForm {
    pub mode: FormMode,
    pub fields: ModFields,
    pub focus: FormField,
    categories: Vec<String>,
}

impl ModForm {
    pub fn add(categories: Vec<String>, category: &CategoryFilter) -> Self {
        let fields = ModFields::default().with_category(category.as_exact().unwrap_or_default());
        Self {
            mode: FormMode::Add,
            fields,
            focus: FormField::Name,
            categories,
        }
    }

    pub fn edit(record: &ModRecord, categories: Vec<String>) -> Self {
        Self {
            mode: FormMode::Edit(record.id),
            fields: record.fields.clone(),
            focus: FormField::Name,
            categories,
        }
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Add => "Add mod",
            FormMode::Edit(_) => "Edit mod",
        }
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.fields.name,
            FormField::Version => &self.fields.version,
            FormField::Category => &self.fields.category,
            FormField::Cover => self.fields.path(ModPath::Cover),
            FormField::Script => self.fields.path(ModPath::Script),
            FormField::Blend => self.fields.path(ModPath::Blend),
            FormField::WorkFolder => self.fields.path(ModPath::WorkFolder),
        }
    }

    fn value_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Name => &mut self.fields.name,
            FormField::Version => &mut self.fields.version,
            FormField::Category => &mut self.fields.category,
            FormField::Cover => &mut self.fields.cover_path,
            FormField::Script => &mut self.fields.bat_path,
            FormField::Blend => &mut self.fields.blend_path,
            FormField::WorkFolder => &mut self.fields.work_path,
        }
    }

    pub fn push_char(&mut self, ch: char) {
        self.value_mut(self.focus).push(ch);
    }

    pub fn push_str(&mut self, text: &str) {
        let line = text.lines().next().unwrap_or_default();
        self.value_mut(self.focus).push_str(line);
    }

    pub fn backspace(&mut self) {
        self.value_mut(self.focus).pop();
    }

    pub fn next_field(&mut self) {
        let index = self.focus_index();
        self.focus = FormField::ALL[(index + 1) % FormField::ALL.len()];
    }

    pub fn prev_field(&mut self) {
        let index = self.focus_index();
        let len = FormField::ALL.len();
        self.focus = FormField::ALL[(index + len - 1) % len];
    }

    fn focus_index(&self) -> usize {
        FormField::ALL
            .iter()
            .position(|field| *field == self.focus)
            .unwrap_or(0)
    }

    /// Steps through blank plus the known categories.
    pub fn cycle_category(&mut self, forward: bool) {
        let mut options = vec![String::new()];
        options.extend(self.categories.iter().cloned());
        let current = options
            .iter()
            .position(|option| *option == self.fields.category);
        let len = options.len();
        let next = match (current, forward) {
            (Some(index), true) => (index + 1) % len,
            (Some(index), false) => (index + len - 1) % len,
            (None, true) => 0,
            (None, false) => len - 1,
        };
        self.fields.category = options[next].clone();
    }
}

pub struct App {
    pub session: Session,
    pub listing: Listing,
    pub total_mods: usize,
    pub categories: Vec<String>,
    pub category_filter: CategoryFilter,
    pub name_filter: String,
    pub selected: usize,
    pub input_mode: InputMode,
    pub form: Option<ModForm>,
    pub dialog: Option<Dialog>,
    pub status: String,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    clipboard: Option<Clipboard>,
    spawner: Box<dyn ProcessSpawner>,
}

impl App {
    pub fn new(session: Session) -> Result<Self> {
        Self::with_spawner(session, Box::new(SystemSpawner))
    }

    pub fn with_spawner(session: Session, spawner: Box<dyn ProcessSpawner>) -> Result<Self> {
        let mut app = Self {
            session,
            listing: Listing::default(),
            total_mods: 0,
            categories: Vec::new(),
            category_filter: CategoryFilter::All,
            name_filter: String::new(),
            selected: 0,
            input_mode: InputMode::Normal,
            form: None,
            dialog: None,
            status: String::new(),
            toast: None,
            should_quit: false,
            clipboard: None,
            spawner,
        };
        app.refresh(None)?;
        app.status = format!("{} mod(s) loaded", app.listing.len());
        Ok(app)
    }

    pub fn query(&self) -> ModQuery {
        ModQuery::default()
            .with_name(Some(&self.name_filter))
            .with_category(self.category_filter.clone())
    }

    /// Reloads categories and the listing, keeping `select_id` (or the
    /// current mod) selected when it is still visible.
    pub fn refresh(&mut self, select_id: Option<i64>) -> Result<()> {
        let keep = select_id.or_else(|| self.selected_mod().map(|record| record.id));
        self.categories = self.session.categories()?;
        if let CategoryFilter::Exact(category) = &self.category_filter {
            if !self.categories.contains(category) {
                self.category_filter = CategoryFilter::All;
            }
        }
        self.listing = self.session.listing(self.query())?;
        self.total_mods = self.session.store.count()?;
        if let Some(index) = keep.and_then(|id| self.listing.position(id)) {
            self.selected = index;
        }
        self.clamp_selection();
        Ok(())
    }

    fn refresh_or_report(&mut self, select_id: Option<i64>) {
        if let Err(err) = self.refresh(select_id) {
            self.status = format!("Refresh failed: {err}");
            self.session.log.error(format!("Refresh failed: {err}"));
        }
    }

    pub fn selected_mod(&self) -> Option<&ModRecord> {
        self.listing.get(self.selected)
    }

    pub fn clamp_selection(&mut self) {
        let len = self.listing.len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.listing.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.listing.len().saturating_sub(1);
    }

    pub fn tick(&mut self) {
        if let Some(toast) = &self.toast {
            if toast.expires_at <= Instant::now() {
                self.toast = None;
            }
        }
    }

    pub fn set_toast(&mut self, message: &str, level: ToastLevel, duration: Duration) {
        self.toast = Some(Toast {
            message: message.to_string(),
            level,
            expires_at: Instant::now() + duration,
        });
    }

    fn report_failure(&mut self, action: &str, err: anyhow::Error) {
        self.status = format!("{action} failed: {err}");
        self.set_toast(&self.status.clone(), ToastLevel::Error, TOAST_DURATION);
    }

    pub fn cycle_category(&mut self) {
        self.category_filter = match &self.category_filter {
            CategoryFilter::All => match self.categories.first() {
                Some(first) => CategoryFilter::Exact(first.clone()),
                None => CategoryFilter::All,
            },
            CategoryFilter::Exact(current) => {
                let next = self
                    .categories
                    .iter()
                    .position(|category| category == current)
                    .and_then(|index| self.categories.get(index + 1));
                match next {
                    Some(category) => CategoryFilter::Exact(category.clone()),
                    None => CategoryFilter::All,
                }
            }
        };
        self.refresh_or_report(None);
        self.status = format!("Category: {}", self.category_filter.label());
    }

    pub fn set_name_filter(&mut self, value: &str) {
        self.name_filter = value.to_string();
        self.refresh_or_report(None);
    }

    pub fn begin_search(&mut self) {
        self.input_mode = InputMode::Editing {
            prompt: "Search".to_string(),
            buffer: self.name_filter.clone(),
            purpose: InputPurpose::FilterName,
        };
    }

    pub fn begin_set_base_folder(&mut self) {
        self.input_mode = InputMode::Editing {
            prompt: "Base folder".to_string(),
            buffer: self.session.base_folder().display().to_string(),
            purpose: InputPurpose::BaseFolder,
        };
    }

    pub fn handle_submit(&mut self, purpose: InputPurpose, value: String) -> Result<()> {
        match purpose {
            InputPurpose::FilterName => {
                self.set_name_filter(&value);
                self.status = if self.name_filter.trim().is_empty() {
                    "Search cleared".to_string()
                } else {
                    format!("{} match(es) for \"{}\"", self.listing.len(), value.trim())
                };
            }
            InputPurpose::BaseFolder => {
                let path = self.session.set_base_folder(&value)?;
                self.status = format!("Base folder set: {}", path.display());
            }
        }
        Ok(())
    }

    pub fn open_add_form(&mut self) {
        self.form = Some(ModForm::add(self.categories.clone(), &self.category_filter));
    }

    pub fn open_edit_form(&mut self) {
        let Some(record) = self.selected_mod().cloned() else {
            self.status = "No mod selected".to_string();
            return;
        };
        self.form = Some(ModForm::edit(&record, self.categories.clone()));
    }

    /// Saves the form. It stays open when the store rejects the values.
    pub fn submit_form(&mut self) {
        let Some(form) = self.form.clone() else {
            return;
        };
        let result = match form.mode {
            FormMode::Add => self.session.add_mod(&form.fields),
            FormMode::Edit(id) => self.session.edit_mod(id, &form.fields).map(|()| id),
        };
        match result {
            Ok(id) => {
                self.form = None;
                self.refresh_or_report(Some(id));
                let verb = match form.mode {
                    FormMode::Add => "added",
                    FormMode::Edit(_) => "updated",
                };
                self.status = format!("Mod {verb}: {}", form.fields.name.trim());
                self.set_toast(&self.status.clone(), ToastLevel::Info, TOAST_DURATION);
            }
            Err(err) => self.report_failure("Save", err),
        }
    }

    pub fn cancel_form(&mut self) {
        self.form = None;
        self.status = "Edit cancelled".to_string();
    }

    pub fn request_delete(&mut self) {
        let Some(record) = self.selected_mod() else {
            self.status = "No mod selected".to_string();
            return;
        };
        let (id, name) = (record.id, record.name().to_string());
        if !self.session.config.confirm_mod_delete {
            self.delete_mod(id);
            return;
        }
        self.dialog = Some(Dialog {
            title: "Delete mod".to_string(),
            message: format!("Delete \"{name}\" from the catalog?\nFiles on disk are not touched."),
            yes_label: "Delete".to_string(),
            no_label: "Cancel".to_string(),
            choice: DialogChoice::No,
            kind: DialogKind::DeleteMod { id, name },
        });
    }

    pub fn toggle_dialog_choice(&mut self) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = match dialog.choice {
                DialogChoice::Yes => DialogChoice::No,
                DialogChoice::No => DialogChoice::Yes,
            };
        }
    }

    pub fn resolve_dialog(&mut self, choice: DialogChoice) {
        let Some(dialog) = self.dialog.take() else {
            return;
        };
        if choice == DialogChoice::No {
            self.status = "Cancelled".to_string();
            return;
        }
        match dialog.kind {
            DialogKind::DeleteMod { id, .. } => self.delete_mod(id),
        }
    }

    fn delete_mod(&mut self, id: i64) {
        match self.session.delete_mod(id) {
            Ok(true) => {
                self.refresh_or_report(None);
                self.status = format!("Mod #{id} deleted");
            }
            Ok(false) => {
                self.refresh_or_report(None);
                self.status = format!("Mod #{id} was already gone");
            }
            Err(err) => self.report_failure("Delete", err),
        }
    }

    pub fn run_selected(&mut self) {
        let Some(record) = self.selected_mod() else {
            self.status = "No mod selected".to_string();
            return;
        };
        let (id, name) = (record.id, record.name().to_string());
        match self.session.run_mod(&mut self.spawner, id) {
            Ok(_) => {
                self.refresh_or_report(Some(id));
                self.status = format!("Started {name}");
                self.set_toast(&self.status.clone(), ToastLevel::Info, TOAST_DURATION);
            }
            Err(err) => self.report_failure("Run", err),
        }
    }

    pub fn open_selected(&mut self, which: ModPath) {
        let Some(id) = self.selected_mod().map(|record| record.id) else {
            self.status = "No mod selected".to_string();
            return;
        };
        match self.session.open_mod_path(&mut self.spawner, id, which) {
            Ok(path) => self.status = format!("Opened {}", path.display()),
            Err(err) => self.report_failure("Open", err),
        }
    }

    pub fn open_base_folder(&mut self) {
        match self.session.open_base_folder(&mut self.spawner) {
            Ok(path) => self.status = format!("Opened {}", path.display()),
            Err(err) => self.report_failure("Open", err),
        }
    }

    pub fn copy_script_path(&mut self) {
        let Some(script) = self
            .selected_mod()
            .map(|record| record.path(ModPath::Script).to_string())
        else {
            self.status = "No mod selected".to_string();
            return;
        };
        if script.is_empty() {
            self.status = "No script set for this mod".to_string();
            return;
        }
        if self.copy_to_clipboard(&script) {
            self.status = format!("Copied {script}");
            self.set_toast("Script path copied", ToastLevel::Info, TOAST_DURATION);
        }
    }

    fn copy_to_clipboard(&mut self, text: &str) -> bool {
        let result = match self.clipboard_mut() {
            Some(clipboard) => clipboard.set_text(text.to_string()),
            None => return false,
        };
        if let Err(err) = result {
            self.status = format!("Clipboard copy failed: {err}");
            self.session
                .log
                .warn(format!("Clipboard copy failed: {err}"));
            return false;
        }
        true
    }

    fn clipboard_mut(&mut self) -> Option<&mut Clipboard> {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(err) => {
                    self.status = format!("Clipboard unavailable: {err}");
                    self.session
                        .log
                        .warn(format!("Clipboard unavailable: {err}"));
                    return None;
                }
            }
        }
        self.clipboard.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{launcher::FakeSpawner, library::STATUS_RUNNING};
    use std::fs;

    fn app_with(dir: &std::path::Path, mods: &[(&str, &str)]) -> App {
        let session = Session::in_memory(dir.to_path_buf());
        for (name, category) in mods {
            session
                .store
                .create(&ModFields::named(*name).with_category(*category))
                .unwrap();
        }
        App::with_spawner(session, Box::new(FakeSpawner::default())).unwrap()
    }

    #[test]
    fn starts_with_sorted_listing_and_categories() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with(
            dir.path(),
            &[("Rig Setup", "Rigging"), ("Jump Cycle", "Animation"), ("Idle Loop", "Animation")],
        );
        assert_eq!(app.listing.names(), vec!["Idle Loop", "Jump Cycle", "Rig Setup"]);
        assert_eq!(app.categories, vec!["Animation", "Rigging"]);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn category_cycle_wraps_back_to_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), &[("A", "Animation"), ("B", "Rigging")]);
        app.cycle_category();
        assert_eq!(app.category_filter, CategoryFilter::Exact("Animation".into()));
        assert_eq!(app.listing.names(), vec!["A"]);
        app.cycle_category();
        assert_eq!(app.category_filter, CategoryFilter::Exact("Rigging".into()));
        app.cycle_category();
        assert_eq!(app.category_filter, CategoryFilter::All);
        assert_eq!(app.listing.len(), 2);
    }

    #[test]
    fn selection_follows_mod_across_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), &[("Beta", ""), ("Gamma", "")]);
        app.select_last();
        let gamma = app.selected_mod().unwrap().id;
        app.session.store.create(&ModFields::named("Alpha")).unwrap();
        app.refresh(None).unwrap();
        assert_eq!(app.selected_mod().unwrap().id, gamma);
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn add_form_saves_and_selects_new_mod() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), &[("Beta", "Animation")]);
        app.open_add_form();
        for ch in "Alpha".chars() {
            app.form.as_mut().unwrap().push_char(ch);
        }
        app.form.as_mut().unwrap().focus = FormField::Category;
        app.form.as_mut().unwrap().cycle_category(true);
        app.submit_form();

        assert!(app.form.is_none());
        let selected = app.selected_mod().unwrap();
        assert_eq!(selected.name(), "Alpha");
        assert_eq!(selected.fields.category, "Animation");
    }

    #[test]
    fn invalid_form_stays_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), &[]);
        app.open_add_form();
        app.submit_form();
        assert!(app.form.is_some());
        assert!(app.status.starts_with("Save failed"));
        assert_eq!(app.session.store.count().unwrap(), 0);
    }

    #[test]
    fn edit_form_keeps_status_and_last_run() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), &[("Jump Cycle", "")]);
        let id = app.selected_mod().unwrap().id;
        app.session
            .store
            .set_run_status(id, STATUS_RUNNING, 1_700_000_000)
            .unwrap();
        app.refresh(None).unwrap();

        app.open_edit_form();
        let form = app.form.as_mut().unwrap();
        form.focus = FormField::Version;
        form.push_str("2.0\nignored");
        app.submit_form();

        let record = app.session.store.require(id).unwrap();
        assert_eq!(record.fields.version, "2.0");
        assert_eq!(record.fields.status, STATUS_RUNNING);
        assert_eq!(record.fields.last_run, 1_700_000_000);
    }

    #[test]
    fn delete_asks_for_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), &[("Doomed", "Misc")]);
        app.request_delete();
        assert!(app.dialog.is_some());
        app.resolve_dialog(DialogChoice::No);
        assert_eq!(app.session.store.count().unwrap(), 1);

        app.request_delete();
        app.resolve_dialog(DialogChoice::Yes);
        assert_eq!(app.session.store.count().unwrap(), 0);
        assert!(app.listing.is_empty());
        assert!(app.categories.is_empty());
    }

    #[test]
    fn delete_without_confirmation_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), &[("Doomed", "")]);
        app.session.config.confirm_mod_delete = false;
        app.request_delete();
        assert!(app.dialog.is_none());
        assert_eq!(app.session.store.count().unwrap(), 0);
    }

    #[test]
    fn vanished_category_filter_falls_back_to_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), &[("Solo", "Rigging"), ("Other", "")]);
        app.cycle_category();
        assert_eq!(app.listing.names(), vec!["Solo"]);
        app.session.config.confirm_mod_delete = false;
        app.request_delete();
        assert_eq!(app.category_filter, CategoryFilter::All);
        assert_eq!(app.listing.names(), vec!["Other"]);
    }

    #[test]
    fn run_updates_selected_mod() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("start.sh");
        fs::write(&script, "true\n").unwrap();
        let session = Session::in_memory(dir.path().to_path_buf());
        let mut fields = ModFields::named("Jump Cycle");
        fields.bat_path = script.to_string_lossy().into_owned();
        session.store.create(&fields).unwrap();
        let mut app = App::with_spawner(session, Box::new(FakeSpawner::default())).unwrap();

        app.run_selected();
        let record = app.selected_mod().unwrap();
        assert_eq!(record.fields.status, STATUS_RUNNING);
        assert!(record.fields.has_run());
    }

    #[test]
    fn failed_run_reports_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), &[("No Script", "")]);
        app.run_selected();
        assert!(app.status.starts_with("Run failed"));
        assert!(app.toast.is_some());
        assert!(!app.selected_mod().unwrap().fields.has_run());
    }

    #[test]
    fn search_submit_filters_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with(dir.path(), &[("Dragon Pose", ""), ("Idle Loop", "")]);
        app.handle_submit(InputPurpose::FilterName, "DRAGON".to_string())
            .unwrap();
        assert_eq!(app.listing.names(), vec!["Dragon Pose"]);
        app.handle_submit(InputPurpose::FilterName, String::new())
            .unwrap();
        assert_eq!(app.listing.len(), 2);
    }
}
