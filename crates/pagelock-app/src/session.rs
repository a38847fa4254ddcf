//! A running PageLock session: one browser, one coordinator, one storage area

use crate::browser::LocalBrowser;
use pagelock_agent::TokioTimers;
use pagelock_coordinator::{ActorLink, Coordinator, CoordinatorHandle, JsonFileStore, StateStore};
use pagelock_core::protocol::StateReport;
use pagelock_core::{
    CoordinatorLink, PageLockConfig, PageLockError, PageLockResult, Sender, TabId, TabStatus,
    WindowId,
};
use pagelock_panel::ControlPanel;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info};

/// Windows and tabs to open when a session starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLayout {
    pub windows: Vec<WindowLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowLayout {
    /// URLs of the window's tabs, in strip order
    pub tabs: Vec<String>,
    /// Give this window focus once everything is open
    #[serde(default)]
    pub focused: bool,
}

impl Default for SessionLayout {
    fn default() -> Self {
        Self {
            windows: vec![
                WindowLayout {
                    tabs: vec![
                        "https://example.com/".to_string(),
                        "chrome://settings/".to_string(),
                    ],
                    focused: true,
                },
                WindowLayout {
                    tabs: vec!["https://example.org/".to_string()],
                    focused: false,
                },
            ],
        }
    }
}

impl SessionLayout {
    /// Read a layout file. Unlike the config file, a broken layout is an
    /// error since the user asked for it explicitly.
    pub fn load(path: &Path) -> PageLockResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| {
            PageLockError::Config(format!("Invalid layout {}: {}", path.display(), e))
        })
    }
}

pub struct Session {
    config: PageLockConfig,
    browser: Rc<LocalBrowser>,
    store: Rc<dyn StateStore>,
    coordinator: CoordinatorHandle,
}

impl Session {
    /// Start a session over `store` and run the install hook.
    ///
    /// Spawns local tasks, so this must run inside a `tokio::task::LocalSet`.
    pub async fn start(config: PageLockConfig, store: Rc<dyn StateStore>) -> PageLockResult<Self> {
        let browser = Rc::new(LocalBrowser::new(config.overlay.clone(), Rc::new(TokioTimers)));
        let coordinator = Coordinator::new(
            store.clone(),
            browser.clone(),
            browser.clone(),
            browser.clone(),
        )
        .with_config(&config);
        let coordinator = CoordinatorHandle::spawn(coordinator);
        coordinator.installed().await?;

        info!(key = %config.storage_key, "Session started");
        Ok(Self {
            config,
            browser,
            store,
            coordinator,
        })
    }

    /// Start a session backed by the storage file in the data directory.
    pub async fn open(config: PageLockConfig) -> PageLockResult<Self> {
        let store = JsonFileStore::open(config.storage_path()).await?;
        Self::start(config, Rc::new(store)).await
    }

    /// Open the windows and tabs of `layout` and load every page.
    pub async fn restore(&self, layout: &SessionLayout) -> PageLockResult<()> {
        let mut focus = None;
        for window in &layout.windows {
            let window_id = self.browser.open_window();
            for url in &window.tabs {
                self.open_tab(window_id, url).await?;
            }
            if window.focused {
                focus = Some(window_id);
            }
        }
        if let Some(window_id) = focus {
            self.browser.focus(window_id)?;
        }
        debug!(windows = layout.windows.len(), "Layout restored");
        Ok(())
    }

    /// Open a tab and load its page.
    pub async fn open_tab(&self, window_id: WindowId, url: &str) -> PageLockResult<TabId> {
        let tab_id = self.browser.open_tab(window_id, url)?;
        self.load_tab(tab_id).await?;
        Ok(tab_id)
    }

    /// Complete the tab's page load: inject the agent, let it sync, then run
    /// the navigation hook.
    pub async fn load_tab(&self, tab_id: TabId) -> PageLockResult<()> {
        let tab = self.browser.load_page(tab_id)?;
        if let Some(agent) = self.browser.agent(tab_id) {
            let link = self.coordinator.link(Sender::tab(tab.clone()));
            agent.sync_initial_state(&link).await;
        }
        self.coordinator
            .tab_updated(tab, Some(TabStatus::Complete))
            .await?;
        Ok(())
    }

    /// Navigate a tab and wait for the new page to load.
    pub async fn navigate(&self, tab_id: TabId, url: &str) -> PageLockResult<()> {
        self.browser.navigate(tab_id, url)?;
        if let Some(tab) = self.browser.tab(tab_id) {
            self.coordinator
                .tab_updated(tab, Some(TabStatus::Loading))
                .await?;
        }
        self.load_tab(tab_id).await
    }

    /// Press a keyboard shortcut.
    pub async fn shortcut(&self, command: &str) -> PageLockResult<()> {
        Ok(self.coordinator.command(command).await?)
    }

    /// Lock or unlock as an external caller would.
    pub async fn set_locked(
        &self,
        locked: bool,
        window_id: Option<WindowId>,
    ) -> PageLockResult<()> {
        Ok(self.link().set_state(locked, window_id).await?)
    }

    /// Query the lock as an external caller would.
    pub async fn state(&self, window_id: Option<WindowId>) -> PageLockResult<StateReport> {
        Ok(self.link().get_state(window_id).await?)
    }

    /// Deliver a raw protocol message. `None` means the message was not
    /// handled.
    pub async fn send_raw(&self, message: &Value, sender: Sender) -> PageLockResult<Option<Value>> {
        Ok(self.coordinator.handle_raw(message, sender).await?)
    }

    /// Open the control panel on the current window and wait for it to load.
    pub async fn open_panel(&self) -> ControlPanel {
        let panel = ControlPanel::with_storage_key(
            Rc::new(self.link()),
            self.browser.clone(),
            self.config.storage_key.clone(),
        );
        panel.watch(self.store.subscribe());
        panel.mount().await;
        panel
    }

    pub fn browser(&self) -> &Rc<LocalBrowser> {
        &self.browser
    }

    pub fn config(&self) -> &PageLockConfig {
        &self.config
    }

    fn link(&self) -> ActorLink {
        self.coordinator.link(Sender::extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_has_a_focused_window() {
        let layout = SessionLayout::default();
        assert_eq!(layout.windows.iter().filter(|w| w.focused).count(), 1);
    }

    #[test]
    fn test_layout_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(
            &path,
            r#"{ "windows": [
                { "tabs": ["https://a.test/"] },
                { "tabs": [], "focused": true }
            ] }"#,
        )
        .unwrap();

        let layout = SessionLayout::load(&path).unwrap();
        assert_eq!(layout.windows.len(), 2);
        assert!(!layout.windows[0].focused);
        assert!(layout.windows[1].focused);

        std::fs::write(&path, "{ \"windows\": 3 }").unwrap();
        assert!(matches!(
            SessionLayout::load(&path),
            Err(PageLockError::Config(_))
        ));
    }
}
