use iced::keyboard::{self, key::Named, Key, Modifiers};
use iced::widget::image as image_view;
use iced::widget::image::Handle;
use iced::widget::{button, column, container, row, text, Column, Row};
use iced::{time, Alignment, Element, Length, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod files;
mod preview;
mod state;

use config::Settings;
use state::collection::{ImageCollection, STATUS_LOADING};
use state::data::{ImageEntry, Thumbnail, ThumbnailState};
use state::tags::{folder_label, TagRegistry, TagShortcuts};

const DEFAULT_LOG_FILTER: &str = "image_sorter=info";

/// Main application state
struct ImageSorter {
    /// The open folder and everything known about it
    collection: ImageCollection,
    /// Digit -> destination folder bindings
    tags: TagRegistry,
    settings: Settings,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked the "Open Folder" button
    OpenFolder,
    Next,
    Previous,
    /// Move every tagged image to its destination
    MoveTagged,
    /// A digit was pressed; `rebind` asks for a new folder first
    TagKey { key: String, rebind: bool },
    ClearTag,
    /// Time to drain filesystem watcher events
    Tick,
    /// Background thumbnail decode finished
    ThumbnailLoaded(PathBuf, Option<Thumbnail>),
}

impl ImageSorter {
    /// Create a new instance of the application
    fn new(settings: Settings) -> (Self, Task<Message>) {
        let mut app = ImageSorter {
            collection: ImageCollection::new(settings.prefetch_radius),
            tags: TagRegistry::new(),
            settings,
        };

        if let Some(folder) = app.settings.start_folder.clone() {
            app.collection.load(folder);
        }

        tracing::info!("🎨 Image Sorter initialized: {}", app.collection.status());

        let task = app.thumbnail_tasks();
        (app, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::OpenFolder => {
                // Show the native folder picker dialog
                let folder = FileDialog::new()
                    .set_title("Select Folder with Images")
                    .pick_folder();

                if let Some(folder_path) = folder {
                    self.collection.load(folder_path);
                }
            }
            Message::Next => self.collection.move_next(),
            Message::Previous => self.collection.move_previous(),
            Message::MoveTagged => {
                self.collection.move_images_by_tag();
            }
            Message::TagKey { key, rebind } => self.tag_selected(&key, rebind),
            Message::ClearTag => {
                if let Some(entry) = self.collection.selected_image_mut() {
                    self.tags.clear(entry);
                }
            }
            Message::Tick => {
                let added = self.collection.process_watch_events();
                if added > 0 {
                    tracing::debug!("Watcher added {} images", added);
                }
            }
            Message::ThumbnailLoaded(path, thumbnail) => {
                self.collection.apply_thumbnail(&path, thumbnail);
            }
        }

        self.thumbnail_tasks()
    }

    /// Tag the current image, asking for a destination if the key has none
    fn tag_selected(&mut self, key: &str, rebind: bool) {
        if self.collection.selected_image().is_none() {
            return;
        }

        if rebind || !self.tags.is_bound(key) {
            let folder = FileDialog::new()
                .set_title(format!("Destination for tag {}", key))
                .pick_folder();
            match folder {
                Some(folder) => {
                    tracing::info!("🏷️  Tag {} -> {}", key, folder.display());
                    self.tags.bind(key, folder);
                }
                None => return,
            }
        }

        let applied = match self.collection.selected_image_mut() {
            Some(entry) => self.tags.apply(key, entry),
            None => false,
        };
        if applied {
            self.collection.move_next();
        }
    }

    /// Turn queued thumbnail requests into background tasks
    fn thumbnail_tasks(&mut self) -> Task<Message> {
        let size = self.settings.thumbnail_size;
        let tasks: Vec<Task<Message>> = self
            .collection
            .take_thumbnail_requests()
            .into_iter()
            .map(|path| {
                Task::perform(preview::thumbnail::load_thumbnail(path, size), |(path, thumb)| {
                    Message::ThumbnailLoaded(path, thumb)
                })
            })
            .collect();

        Task::batch(tasks)
    }

    fn subscription(&self) -> Subscription<Message> {
        let keys = keyboard::on_key_press(key_to_message);

        let watch = if self.collection.is_watching() {
            time::every(Duration::from_millis(self.settings.watch_poll_ms)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        Subscription::batch([keys, watch])
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let folder = match self.collection.folder_path() {
            Some(path) => path.display().to_string(),
            None => String::from("No folder open"),
        };

        let status = if self.collection.is_busy() {
            STATUS_LOADING
        } else {
            self.collection.status()
        };

        let toolbar = row![
            button("Open Folder")
                .on_press(Message::OpenFolder)
                .padding(10),
            button("Move Tagged")
                .on_press(Message::MoveTagged)
                .padding(10),
            text(folder).size(14),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let strip = row![
            thumbnail_view(self.collection.previous_image()),
            self.current_view(),
            thumbnail_view(self.collection.next_image()),
        ]
        .spacing(20)
        .align_y(Alignment::Center)
        .height(Length::Fill);

        let content: Column<Message> = column![
            toolbar,
            strip,
            self.tag_legend(),
            text(status).size(16),
        ]
        .spacing(20)
        .padding(20)
        .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into()
    }

    /// The selected image at full size, with its caption
    fn current_view(&self) -> Element<Message> {
        let Some(entry) = self.collection.selected_image() else {
            return container(text("No images").size(24))
                .width(Length::Fill)
                .center_x(Length::Fill)
                .into();
        };

        let position = match self.collection.selected_index() {
            Some(index) => format!("{} / {}", index + 1, self.collection.len()),
            None => String::new(),
        };

        let mut caption = format!("{}  ({})", entry.file_name(), position);
        if let Some(tag) = &entry.tag {
            let destination = tag
                .target_folder()
                .map(|folder| folder_label(&folder))
                .unwrap_or_else(|| String::from("?"));
            caption.push_str(&format!("  →  [{}] {}", tag.key().unwrap_or_default(), destination));
        }
        if self.collection.is_relocated(entry) {
            caption.push_str("  (moved)");
        }

        column![
            image_view(Handle::from_path(entry.file_path()))
                .width(Length::Fill)
                .height(Length::Fill),
            text(caption).size(16),
        ]
        .spacing(10)
        .width(Length::Fill)
        .align_x(Alignment::Center)
        .into()
    }

    /// "[1] keepers   [2] rejects ..." plus a key hint
    fn tag_legend(&self) -> Element<Message> {
        let mut legend = Row::new().spacing(16);

        if self.tags.is_empty() {
            legend = legend.push(text("Press 1-9 to tag the current image with a folder").size(14));
        } else {
            for (key, folder) in self.tags.bindings() {
                legend = legend.push(text(format!("[{}] {}", key, folder_label(&folder))).size(14));
            }
        }

        legend = legend.push(
            text(format!("{} tagged  ·  ←/→ browse  ·  Enter moves", self.collection.tagged_count()))
                .size(14),
        );

        legend.into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Previous/next preview slot
fn thumbnail_view(entry: Option<&ImageEntry>) -> Element<'_, Message> {
    let size = Length::Fixed(140.0);

    let content: Element<Message> = match entry.map(ImageEntry::thumbnail) {
        Some(ThumbnailState::Ready(thumb)) => {
            image_view(Handle::from_rgba(thumb.width, thumb.height, thumb.rgba.clone()))
                .width(Length::Fixed(128.0))
                .height(Length::Fixed(128.0))
                .into()
        }
        Some(ThumbnailState::Pending) => text("…").size(24).into(),
        Some(ThumbnailState::Absent) => text("No preview").size(14).into(),
        None => text("").into(),
    };

    container(content)
        .width(size)
        .height(size)
        .center_x(size)
        .center_y(size)
        .into()
}

fn key_to_message(key: Key, modifiers: Modifiers) -> Option<Message> {
    match key.as_ref() {
        Key::Named(Named::ArrowRight) => Some(Message::Next),
        Key::Named(Named::ArrowLeft) => Some(Message::Previous),
        Key::Named(Named::Enter) => Some(Message::MoveTagged),
        Key::Named(Named::Backspace | Named::Delete) => Some(Message::ClearTag),
        Key::Character(c) if TagRegistry::is_tag_key(c) => Some(Message::TagKey {
            key: c.to_string(),
            rebind: modifiers.control(),
        }),
        _ => None,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> iced::Result {
    init_logging();

    let settings = Settings::load().with_args(std::env::args().skip(1));

    iced::application("Image Sorter", ImageSorter::update, ImageSorter::view)
        .subscription(ImageSorter::subscription)
        .theme(ImageSorter::theme)
        .centered()
        .run_with(move || ImageSorter::new(settings))
}
