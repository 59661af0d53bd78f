use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use crate::api::{ApiError, AskResponse, HttpApiClient, ProductApi, ProductFilter};
use crate::config::Config;
use crate::models::{Product, ProductId, ProductStatus, Role};
use crate::services::conversation::{ConversationError, PendingQuestion};
use crate::services::{
    ConversationState, ConversationStore, Database, ProductEvent, ProductStore, SettingsService,
    Theme,
};
use crate::ui::chat_view;
use crate::ui::input::{parse_command, Command, Target, HELP};
use crate::ui::sidebar;

#[derive(Debug)]
pub enum AppCmd {
    Input(String),
    InputClosed,
    Answer {
        pending: PendingQuestion,
        result: Result<AskResponse, ApiError>,
    },
}

/// Feed each input line to the app until EOF, a read error, or the app
/// going away.
fn forward_lines(reader: impl BufRead, tx: &mpsc::UnboundedSender<AppCmd>) {
    for line in reader.lines() {
        match line {
            Ok(line) => {
                if tx.send(AppCmd::Input(line)).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::error!("Failed to read input: {}", e);
                break;
            }
        }
    }
    let _ = tx.send(AppCmd::InputClosed);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Owns both stores and applies every mutation from a single task: user
/// input, poller events and finished questions all arrive as messages.
pub struct App {
    config: Config,
    api: Arc<dyn ProductApi>,
    db: Database,
    theme: Theme,
    products: ProductStore,
    product_events: mpsc::UnboundedReceiver<ProductEvent>,
    conversation: ConversationStore,
    cmd_tx: mpsc::UnboundedSender<AppCmd>,
    cmd_rx: mpsc::UnboundedReceiver<AppCmd>,
    out: Box<dyn Write + Send>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        let api = HttpApiClient::new(&config.api_base_url, config.request_timeout)
            .context("Failed to create API client")?;
        let db = Database::open(&config.data_dir).await?;
        let theme = SettingsService::load_theme(&db).await;
        Ok(Self::with_parts(
            config,
            Arc::new(api),
            db,
            theme,
            Box::new(std::io::stdout()),
        ))
    }

    pub fn with_parts(
        config: Config,
        api: Arc<dyn ProductApi>,
        db: Database,
        theme: Theme,
        out: Box<dyn Write + Send>,
    ) -> Self {
        let (products, product_events) = ProductStore::new(api.clone(), config.poll_interval);
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        Self {
            config,
            api,
            db,
            theme,
            products,
            product_events,
            conversation: ConversationStore::new(),
            cmd_tx,
            cmd_rx,
            out,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        tracing::info!("Connecting to {}", self.config.api_base_url);
        self.say("Shopwise: ask an AI assistant about any product. Type `help` for commands.");

        match self.products.load().await {
            Ok(()) => self.show_products(),
            Err(e) => {
                tracing::error!("Failed to fetch products: {}", e);
                self.say(format!("Could not load products: {}", e));
            }
        }

        self.spawn_input_reader();
        self.prompt();

        loop {
            tokio::select! {
                Some(event) = self.product_events.recv() => {
                    self.on_product_event(event).await;
                }
                Some(cmd) = self.cmd_rx.recv() => {
                    if self.on_cmd(cmd).await == Flow::Quit {
                        break;
                    }
                    self.prompt();
                }
                else => break,
            }
        }

        self.products.shutdown();
        Ok(())
    }

    // Detached thread: runtime shutdown never waits on a blocked stdin read.
    fn spawn_input_reader(&self) {
        let tx = self.cmd_tx.clone();
        std::thread::spawn(move || forward_lines(std::io::stdin().lock(), &tx));
    }

    async fn on_cmd(&mut self, cmd: AppCmd) -> Flow {
        match cmd {
            AppCmd::Input(line) => self.handle_line(&line).await,
            AppCmd::InputClosed => Flow::Quit,
            AppCmd::Answer { pending, result } => {
                if self.conversation.finish_question(&pending, result) {
                    let rendered = self.conversation.messages().last().map(|reply| {
                        chat_view::render_message(reply, self.theme, self.config.color)
                    });
                    if let Some(rendered) = rendered {
                        self.say(rendered);
                    }
                }
                Flow::Continue
            }
        }
    }

    async fn on_product_event(&mut self, event: ProductEvent) {
        let ProductEvent::Status { id, .. } = &event;
        let id = id.clone();
        let before = self.products.get(&id).map(|p| p.status);

        if let Err(e) = self.products.handle_event(event).await {
            tracing::error!("Failed to refresh products: {}", e);
        }

        let changed = self
            .products
            .get(&id)
            .filter(|product| before != Some(product.status))
            .map(|product| {
                format!(
                    "{}: {}",
                    sidebar::truncate_title(product.title.as_deref()),
                    product.status.label()
                )
            });
        if let Some(line) = changed {
            self.say(line);
        }
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        let command = match parse_command(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Flow::Continue,
            Err(e) => {
                self.say(e.to_string());
                return Flow::Continue;
            }
        };

        match command {
            Command::Quit => return Flow::Quit,
            Command::Help => self.say(HELP),
            Command::List => self.show_products(),
            Command::Refresh(arg) => {
                let filter = match arg {
                    Some(arg) => match ProductStatus::from_str(&arg) {
                        Some(status) => ProductFilter {
                            status: Some(status),
                            ..ProductFilter::default()
                        },
                        None => ProductFilter {
                            search: Some(arg),
                            ..ProductFilter::default()
                        },
                    },
                    None => ProductFilter::default(),
                };
                self.products.set_filter(filter);
                match self.products.load().await {
                    Ok(()) => self.show_products(),
                    Err(e) => self.say(format!("Could not load products: {}", e)),
                }
            }
            Command::Add(url) => match self.products.add(&url).await {
                Ok(product) => {
                    let line = format!(
                        "Added {} [{}]",
                        sidebar::truncate_title(product.title.as_deref()),
                        product.status.label()
                    );
                    self.say(line);
                }
                Err(e) => self.say(format!("Failed to add product: {}", e)),
            },
            Command::Select(target) => self.select(&target),
            Command::Delete(target) => {
                if let Some(id) = self.resolve(&target) {
                    match self.products.remove(&id, &mut self.conversation).await {
                        Ok(()) => self.say("Product deleted"),
                        Err(e) => self.say(format!("Failed to delete product: {}", e)),
                    }
                }
            }
            Command::Retry(target) => {
                if let Some(id) = self.resolve(&target) {
                    if self.products.is_polling(&id) {
                        self.say("Still processing; wait for it to finish or fail");
                        return Flow::Continue;
                    }
                    match self.products.retry(&id).await {
                        Ok(()) => self.say("Retrying..."),
                        Err(e) => self.say(format!("Failed to retry product: {}", e)),
                    }
                }
            }
            Command::Info(target) => {
                if let Some(id) = self.resolve(&target) {
                    match self.api.get_product(&id).await {
                        Ok(detail) => self.say(sidebar::render_detail(&detail)),
                        Err(e) => self.say(format!("Failed to load product: {}", e)),
                    }
                }
            }
            Command::Sessions => self.show_sessions().await,
            Command::History(session_id) => match self.api.chat_messages(&session_id).await {
                Ok(messages) => {
                    let rendered = chat_view::render_history(&messages, self.theme, self.config.color);
                    self.say(rendered);
                }
                Err(e) => self.say(format!("Failed to load conversation: {}", e)),
            },
            Command::Sources => {
                let chunks = self
                    .conversation
                    .messages()
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::Assistant)
                    .map(|m| m.context_chunks.clone())
                    .unwrap_or_default();
                self.say(chat_view::render_sources(&chunks));
            }
            Command::Theme => {
                self.theme = self.theme.toggled();
                if let Err(e) = SettingsService::save_theme(&self.db, self.theme).await {
                    tracing::error!("Failed to save theme: {}", e);
                }
                self.say(format!("Theme: {}", self.theme.as_str()));
            }
            Command::Ask(question) => self.ask(&question),
        }
        Flow::Continue
    }

    fn select(&mut self, target: &Target) {
        let Some(id) = self.resolve(target) else {
            return;
        };
        let Some(product) = self.products.get(&id).cloned() else {
            return;
        };
        if !product.is_ready() {
            self.say(format!(
                "{} is not ready yet ({})",
                sidebar::truncate_title(product.title.as_deref()),
                product.status.label()
            ));
            return;
        }

        self.conversation.select(&product);
        self.say(chat_view::render_header(&product));
        self.say(chat_view::render_empty_state());
    }

    fn ask(&mut self, question: &str) {
        if self.conversation.state() == ConversationState::NoSelection {
            self.say("Select a ready product first (`list`, then `select <n>`)");
            return;
        }

        let pending = match self.conversation.begin_question(question) {
            Ok(pending) => pending,
            Err(ConversationError::AwaitingReply) => {
                self.say("Please wait for the current answer");
                return;
            }
            Err(e) => {
                self.say(e.to_string());
                return;
            }
        };
        self.say(chat_view::render_thinking(self.theme, self.config.color));

        let api = self.api.clone();
        let tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            let result = api
                .ask_question(
                    &pending.product_id,
                    &pending.question,
                    pending.session_id.as_deref(),
                )
                .await;
            let _ = tx.send(AppCmd::Answer { pending, result });
        });
    }

    async fn show_sessions(&mut self) {
        let Some(id) = self.conversation.selected_product_id().cloned() else {
            self.say("Select a product first");
            return;
        };
        match self.api.list_chat_sessions(&id).await {
            Ok(sessions) => {
                let rendered = chat_view::render_sessions(&sessions, self.conversation.session_id());
                self.say(rendered);
            }
            Err(e) => self.say(format!("Failed to load conversations: {}", e)),
        }
    }

    fn resolve(&mut self, target: &Target) -> Option<ProductId> {
        let found: Option<&Product> = match target {
            Target::Index(n) => self.products.products().get(n - 1),
            Target::Id(id) => self.products.get(&ProductId::new(id.as_str())),
        };
        let id = found.map(|p| p.id.clone());
        if id.is_none() {
            self.say("No such product");
        }
        id
    }

    fn show_products(&mut self) {
        let rendered = sidebar::render_products(
            self.products.products(),
            self.conversation.selected_product_id(),
            self.theme,
            self.config.color,
        );
        self.say(rendered);
    }

    fn say(&mut self, text: impl AsRef<str>) {
        if let Err(e) = writeln!(self.out, "{}", text.as_ref()) {
            tracing::warn!("Failed to write output: {}", e);
        }
    }

    fn prompt(&mut self) {
        let _ = write!(self.out, "> ");
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::api::mock::{product, MockApi};
    use crate::services::conversation::FALLBACK_REPLY;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn test_config() -> Config {
        Config {
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            poll_interval: Duration::from_millis(2000),
            request_timeout: Duration::from_secs(5),
            data_dir: PathBuf::from("/tmp/shopwise-test"),
            color: false,
        }
    }

    async fn test_app(api: &Arc<MockApi>) -> (App, SharedBuf) {
        let out = SharedBuf::default();
        let mut app = App::with_parts(
            test_config(),
            api.clone(),
            Database::new_in_memory().unwrap(),
            Theme::Dark,
            Box::new(out.clone()),
        );
        app.products.load().await.unwrap();
        (app, out)
    }

    #[tokio::test]
    async fn test_select_refuses_unfinished_product() {
        let api = Arc::new(MockApi::new());
        api.set_catalog(vec![product("a", ProductStatus::Scraping)]);
        let (mut app, out) = test_app(&api).await;

        app.handle_line("select 1").await;

        assert_eq!(app.conversation.state(), ConversationState::NoSelection);
        assert!(out.text().contains("not ready yet (Scraping...)"));
    }

    #[tokio::test]
    async fn test_question_round_trip_through_actor() {
        let api = Arc::new(MockApi::new());
        api.set_catalog(vec![product("a", ProductStatus::Completed)]);
        api.push_answer(Err(ApiError::Network("offline".to_string())));
        let (mut app, out) = test_app(&api).await;

        app.handle_line("select 1").await;
        app.handle_line("Is this good?").await;
        assert_eq!(app.conversation.state(), ConversationState::AwaitingReply);

        app.handle_line("Another?").await;
        assert!(out.text().contains("Please wait for the current answer"));

        let cmd = app.cmd_rx.recv().await.unwrap();
        app.on_cmd(cmd).await;

        let messages = app.conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].content, FALLBACK_REPLY);
        assert!(out.text().contains(FALLBACK_REPLY));
        assert_eq!(app.conversation.state(), ConversationState::Idle);
    }

    #[tokio::test]
    async fn test_ask_without_selection() {
        let api = Arc::new(MockApi::new());
        let (mut app, out) = test_app(&api).await;

        app.handle_line("Is this good?").await;

        assert!(api.asks().is_empty());
        assert!(out.text().contains("Select a ready product first"));
    }

    #[tokio::test]
    async fn test_delete_selected_product_closes_conversation() {
        let api = Arc::new(MockApi::new());
        api.set_catalog(vec![
            product("a", ProductStatus::Completed),
            product("b", ProductStatus::Completed),
        ]);
        let (mut app, _out) = test_app(&api).await;

        app.handle_line("select a").await;
        app.handle_line("delete 2").await;
        assert_eq!(
            app.conversation.selected_product_id(),
            Some(&ProductId::new("a"))
        );

        app.handle_line("delete 1").await;
        assert_eq!(app.conversation.state(), ConversationState::NoSelection);
        assert!(app.products.products().is_empty());
    }

    #[test]
    fn test_input_lines_are_forwarded_until_eof() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        forward_lines(std::io::Cursor::new("list\nquit\n"), &tx);

        assert!(matches!(rx.try_recv(), Ok(AppCmd::Input(line)) if line == "list"));
        assert!(matches!(rx.try_recv(), Ok(AppCmd::Input(line)) if line == "quit"));
        assert!(matches!(rx.try_recv(), Ok(AppCmd::InputClosed)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_input_reader_stops_when_app_is_gone() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        // Endless input: only the closed channel can end the loop.
        forward_lines(std::io::BufReader::new(std::io::repeat(b'\n')), &tx);
    }

    #[tokio::test]
    async fn test_quit_ends_the_loop() {
        let api = Arc::new(MockApi::new());
        let (mut app, _out) = test_app(&api).await;

        assert_eq!(app.handle_line("exit").await, Flow::Quit);
        assert_eq!(app.on_cmd(AppCmd::InputClosed).await, Flow::Quit);
    }

    #[tokio::test]
    async fn test_retry_refused_while_still_processing() {
        let api = Arc::new(MockApi::new());
        let (mut app, out) = test_app(&api).await;
        app.handle_line("add https://www.amazon.com/dp/B0").await;
        assert!(app.products.is_polling(&ProductId::new("new")));

        app.handle_line("retry new").await;

        assert!(out.text().contains("Still processing"));
        app.products.shutdown();
    }

    #[tokio::test]
    async fn test_theme_toggle_is_persisted() {
        let api = Arc::new(MockApi::new());
        let (mut app, out) = test_app(&api).await;

        app.handle_line("theme").await;

        assert_eq!(app.theme, Theme::Light);
        assert_eq!(SettingsService::load_theme(&app.db).await, Theme::Light);
        assert!(out.text().contains("Theme: light"));
    }

    #[tokio::test]
    async fn test_quit_and_unknown_target() {
        let api = Arc::new(MockApi::new());
        let (mut app, out) = test_app(&api).await;

        assert_eq!(app.handle_line("retry 4").await, Flow::Continue);
        assert!(out.text().contains("No such product"));
        assert_eq!(app.handle_line("quit").await, Flow::Quit);
    }
}
