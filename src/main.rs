use iced::widget::{button, canvas, column, container, image, pick_list, row, slider, text, Column, Stack};
use iced::{Element, Length, Subscription, Task, Theme};
use iced_aw::Wrap;
use rfd::FileDialog;

mod config;
mod error;
mod frames;
mod source;
mod state;
mod ui;

use config::AppConfig;
use frames::loader::{self, Frame};
use source::remote::{ExperimentEntry, UniqueDetails};
use source::{build_source, BoundingBox, MeasurementTable};
use state::playback::PlaybackState;
use state::series::SeriesRow;
use state::session::SessionContext;
use ui::chart::SeriesChart;
use ui::overlay::DetectionOverlay;

/// One selectable experiment. Local experiments are plain folders; remote
/// ones carry the transaction id that keys their measurement summary.
#[derive(Debug, Clone)]
struct ExperimentChoice {
    name: String,
    transaction_id: Option<String>,
}

/// Main application state
struct TimelapseViewer {
    config: AppConfig,
    /// Playback state plus per-well series/history
    session: SessionContext,
    experiments: Vec<ExperimentChoice>,
    experiment: Option<String>,
    wells: Vec<String>,
    well: Option<String>,
    /// Decoded frames of the selected well, in playback order
    frames: Vec<Frame>,
    /// Measurement table for the selected run
    table: Option<MeasurementTable>,
    /// Detections rendered over the current frame
    current_boxes: Vec<BoundingBox>,
    current_labels: Vec<String>,
    /// Warning shown in place of the viewer when frames cannot be loaded
    warning: Option<String>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User clicked the image-folder picker button
    PickImageRoot,
    /// Experiment catalog arrived (remote) or failed
    ExperimentsLoaded(Result<Vec<ExperimentEntry>, String>),
    ExperimentSelected(String),
    /// Run metadata for the selected experiment arrived
    DetailsLoaded(Result<UniqueDetails, String>),
    /// Measurement table finished loading
    SourceLoaded(Result<MeasurementTable, String>),
    WellSelected(String),
    /// Background frame decode completed
    FramesLoaded(Result<Vec<Frame>, String>),
    PlayTimelapse,
    ResumeTimelapse,
    StopTimelapse,
    ClearData,
    FrameSliderMoved(u32),
    /// Playback heartbeat; one frame is entered per tick
    Tick,
}

impl TimelapseViewer {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = AppConfig::from_env();
        log::info!("🔬 Timelapse viewer starting");

        let mut app = TimelapseViewer {
            config,
            session: SessionContext::new(),
            experiments: Vec::new(),
            experiment: None,
            wells: Vec::new(),
            well: None,
            frames: Vec::new(),
            table: None,
            current_boxes: Vec::new(),
            current_labels: Vec::new(),
            warning: None,
            status: String::from("Ready."),
        };

        let mut tasks = Vec::new();

        match app.config.datasource_endpoint.clone() {
            Some(endpoint) => {
                let timeout = app.config.datasource_timeout;
                app.status = String::from("Loading experiments from the datasource...");
                tasks.push(Task::perform(
                    async move {
                        source::remote::fetch_experiments(endpoint, timeout)
                            .await
                            .map_err(|e| e.to_string())
                    },
                    Message::ExperimentsLoaded,
                ));
            }
            None => app.refresh_local_experiments(),
        }

        // A configured local measurement file is loaded once, up front
        if app.config.source_data_file.is_some() {
            if let Some(src) = build_source(&app.config, None, None) {
                tasks.push(Task::perform(
                    async move { src.load().await.map_err(|e| e.to_string()) },
                    Message::SourceLoaded,
                ));
            }
        }

        (app, Task::batch(tasks))
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::PickImageRoot => {
                // Show the native folder picker dialog
                let folder = FileDialog::new()
                    .set_title("Select Folder with Timelapse Images")
                    .pick_folder();

                if let Some(folder) = folder {
                    log::info!("📁 Image root set to {}", folder.display());
                    self.config.image_root = Some(folder);
                    if self.config.datasource_endpoint.is_none() {
                        self.refresh_local_experiments();
                    }
                }

                Task::none()
            }
            Message::ExperimentsLoaded(Ok(entries)) => {
                self.experiments = entries
                    .into_iter()
                    .map(|entry| ExperimentChoice {
                        name: entry.experiment_name,
                        transaction_id: Some(entry.transaction_id),
                    })
                    .collect();
                self.status = format!("Found {} experiments.", self.experiments.len());
                Task::none()
            }
            Message::ExperimentsLoaded(Err(e)) => {
                log::error!("❌ Failed to list experiments: {}", e);
                self.status = format!("Datasource unavailable: {}", e);
                Task::none()
            }
            Message::ExperimentSelected(name) => {
                self.experiment = Some(name.clone());
                self.wells.clear();
                self.well = None;
                self.frames.clear();
                self.warning = None;
                self.current_boxes.clear();
                self.current_labels.clear();
                self.session.playback = PlaybackState::default();

                let transaction_id = self
                    .experiments
                    .iter()
                    .find(|choice| choice.name == name)
                    .and_then(|choice| choice.transaction_id.clone());

                match (self.config.datasource_endpoint.clone(), transaction_id) {
                    (Some(endpoint), Some(transaction_id)) => {
                        let timeout = self.config.datasource_timeout;
                        self.status = format!("Loading run details for {}...", name);
                        Task::perform(
                            async move {
                                source::remote::fetch_unique_details(
                                    endpoint,
                                    transaction_id,
                                    timeout,
                                )
                                .await
                                .map_err(|e| e.to_string())
                            },
                            Message::DetailsLoaded,
                        )
                    }
                    _ => {
                        self.refresh_wells();
                        Task::none()
                    }
                }
            }
            Message::DetailsLoaded(Ok(details)) => {
                // The datasource knows the run layout; fall back to the
                // configured segments when it reports none
                if let Some(run_version) = details.run_version.first() {
                    self.config.run_version = run_version.clone();
                }
                if let Some(run_name) = details.run_name.first() {
                    self.config.run_name = run_name.clone();
                }
                self.refresh_wells();

                let categories = if details.result_class_name.is_empty() {
                    None
                } else {
                    Some(details.result_class_name.clone())
                };
                let transaction_id = self
                    .experiment
                    .as_ref()
                    .and_then(|name| self.experiments.iter().find(|c| &c.name == name))
                    .and_then(|choice| choice.transaction_id.clone());

                match build_source(&self.config, transaction_id.as_deref(), categories) {
                    Some(src) => {
                        self.status = format!("Loading measurements from {}...", src.describe());
                        Task::perform(
                            async move { src.load().await.map_err(|e| e.to_string()) },
                            Message::SourceLoaded,
                        )
                    }
                    None => Task::none(),
                }
            }
            Message::DetailsLoaded(Err(e)) => {
                log::error!("❌ Failed to load run details: {}", e);
                self.status = format!("Datasource unavailable: {}", e);
                // Browsing still works with the configured run layout
                self.refresh_wells();
                Task::none()
            }
            Message::SourceLoaded(Ok(table)) => {
                self.status = format!("Loaded {} measurement rows.", table.len());
                log::info!("📊 Measurement table ready ({} rows)", table.len());
                self.table = Some(table);
                Task::none()
            }
            Message::SourceLoaded(Err(e)) => {
                log::error!("❌ Failed to load measurements: {}", e);
                self.table = None;
                self.status = format!("Measurement data unavailable: {}", e);
                Task::none()
            }
            Message::WellSelected(well) => {
                self.well = Some(well.clone());
                self.session.ensure_well(&well);
                self.session.playback = PlaybackState::default();
                self.frames.clear();
                self.warning = None;
                self.current_boxes.clear();
                self.current_labels.clear();

                if let Some(dir) = self
                    .experiment
                    .as_ref()
                    .and_then(|experiment| self.config.well_dir(experiment, &well))
                {
                    self.status = format!("Loading frames for well {}...", well);
                    return Task::perform(loader::load_frames(dir), Message::FramesLoaded);
                }

                Task::none()
            }
            Message::FramesLoaded(Ok(frames)) => {
                self.status = format!("Loaded {} frames.", frames.len());
                self.frames = frames;
                Task::none()
            }
            Message::FramesLoaded(Err(e)) => {
                log::warn!("⚠️ {}", e);
                self.frames.clear();
                self.warning = Some(e);
                self.status = String::from("No frames available for this well.");
                Task::none()
            }
            Message::PlayTimelapse => {
                if self.frames.is_empty() {
                    self.status = String::from("No images found in the specified folder.");
                    return Task::none();
                }
                self.session.playback = self.session.playback.play();
                self.process_current_frame();
                Task::none()
            }
            Message::ResumeTimelapse => {
                if self.frames.is_empty() {
                    self.status = String::from("No images found in the specified folder.");
                    return Task::none();
                }
                self.session.playback = self.session.playback.resume();
                self.process_current_frame();
                Task::none()
            }
            Message::StopTimelapse => {
                self.session.playback = self.session.playback.stop();
                self.status = format!(
                    "Stopped at frame {}. Resume to continue.",
                    self.session.playback.index()
                );
                Task::none()
            }
            Message::ClearData => {
                if let Some(well) = self.well.clone() {
                    self.session.clear_well(&well);
                    self.current_boxes.clear();
                    self.current_labels.clear();
                    self.status = format!("Cleared data for well {}.", well);
                }
                Task::none()
            }
            Message::FrameSliderMoved(value) => {
                let index = value as usize;
                if self.session.playback.is_playing() || index >= self.frames.len() {
                    return Task::none();
                }

                self.session.playback = self.session.playback.scrub_to(index);

                // Re-show the detections recorded for this frame, if playback
                // ever visited it
                let frame_id = self.frames[index].file_name.clone();
                let recorded = self
                    .well
                    .as_ref()
                    .and_then(|well| self.session.history(well))
                    .and_then(|history| history.latest_for(&frame_id))
                    .map(|entry| (entry.boxes.clone(), entry.labels.clone()));

                match recorded {
                    Some((boxes, labels)) => {
                        self.current_boxes = boxes;
                        self.current_labels = labels;
                    }
                    None => {
                        self.current_boxes.clear();
                        self.current_labels.clear();
                    }
                }

                self.status = format!("Frame: {}, idx: {}", frame_id, index);
                Task::none()
            }
            Message::Tick => {
                if !self.session.playback.is_playing() {
                    return Task::none();
                }

                let last = self.frames.len().saturating_sub(1);
                self.session.playback = self.session.playback.advanced(last);

                if self.session.playback.is_playing() {
                    self.process_current_frame();
                } else {
                    self.status = String::from("Timelapse finished. Press Play to restart.");
                }

                Task::none()
            }
        }
    }

    /// Accumulate and display the frame playback currently points at
    fn process_current_frame(&mut self) {
        let index = self.session.playback.index();
        let Some(frame) = self.frames.get(index) else {
            return;
        };
        let frame_id = frame.file_name.clone();

        if let (Some(well), Some(table)) = (self.well.clone(), self.table.as_ref()) {
            let outcome = self.session.advance(&well, &frame_id, table);
            self.current_boxes = outcome.boxes;
            self.current_labels = outcome.labels;
        } else {
            // No measurement table: the frame still plays, the chart stays put
            self.current_boxes.clear();
            self.current_labels.clear();
        }

        self.status = format!("Frame: {}, idx: {}", frame_id, index);
    }

    /// Local mode: experiments are the folders directly under the image root
    fn refresh_local_experiments(&mut self) {
        let Some(root) = self.config.image_root.clone() else {
            let err = error::DashboardError::ConfigurationMissing("IMAGE_FOLDER_PATH");
            log::warn!("⚠️ {}", err);
            self.status = err.to_string();
            return;
        };

        match loader::list_folders(&root) {
            Ok(folders) => {
                self.status = format!("Found {} experiments.", folders.len());
                self.experiments = folders
                    .into_iter()
                    .map(|name| ExperimentChoice {
                        name,
                        transaction_id: None,
                    })
                    .collect();
            }
            Err(e) => {
                log::warn!("⚠️ {}", e);
                self.status = e.to_string();
            }
        }
    }

    /// List the wells of the selected experiment's run
    fn refresh_wells(&mut self) {
        self.wells.clear();

        let Some(experiment) = self.experiment.clone() else {
            return;
        };
        let Some(images_dir) = self.config.images_dir(&experiment) else {
            return;
        };

        match loader::list_folders(&images_dir) {
            Ok(wells) => self.wells = wells,
            Err(e) => {
                log::warn!("⚠️ {}", e);
                self.warning = Some(e.to_string());
            }
        }
    }

    /// Rows the chart should show right now: the full series while playing,
    /// or the series "as of" the scrubbed frame while idle
    fn chart_rows(&self, well: &str) -> Vec<SeriesRow> {
        match self.session.playback {
            PlaybackState::Playing { .. } => self.session.rows(well),
            PlaybackState::Idle { index } => match self.frames.get(index) {
                Some(frame) => {
                    let bound = self.session.display_bound(well, &frame.file_name);
                    self.session.rows_up_to(well, bound)
                }
                None => self.session.rows(well),
            },
        }
    }

    fn categories(&self) -> Vec<String> {
        self.table
            .as_ref()
            .map(|table| table.categories().to_vec())
            .unwrap_or_default()
    }

    /// Column 1: experiment/well pickers, the frame viewer, playback controls
    fn viewer_column(&self) -> Column<Message> {
        let mut col = column![text("Cell Counting Timelapse Viewer").size(24)].spacing(12);

        let root_exists = self
            .config
            .image_root
            .as_ref()
            .map(|root| root.exists())
            .unwrap_or(false);

        if self.config.image_root.is_none() {
            col = col
                .push(text("IMAGE_FOLDER_PATH is not set. Pick the image folder to begin.").size(15))
                .push(button("Select Image Folder").on_press(Message::PickImageRoot).padding(10));
            return col;
        }

        if !root_exists {
            col = col
                .push(
                    text("The specified folder path does not exist. Please pick a valid path.")
                        .size(15),
                )
                .push(button("Select Image Folder").on_press(Message::PickImageRoot).padding(10));
            return col;
        }

        let names: Vec<String> = self.experiments.iter().map(|c| c.name.clone()).collect();
        col = col.push(text("Select an Experiment").size(14));
        col = col.push(
            pick_list(names, self.experiment.clone(), Message::ExperimentSelected)
                .placeholder("Select an Experiment")
                .width(Length::Fill),
        );

        if !self.wells.is_empty() {
            col = col.push(text("Select a Well").size(14));

            let well_buttons: Vec<Element<Message>> = self
                .wells
                .iter()
                .map(|well| {
                    button(text(well.clone()).size(13))
                        .on_press(Message::WellSelected(well.clone()))
                        .padding(6)
                        .into()
                })
                .collect();

            col = col.push(Wrap::with_elements(well_buttons).spacing(6.0).line_spacing(6.0));
        }

        if let Some(warning) = &self.warning {
            col = col.push(text(warning.clone()).size(15));
        } else if !self.frames.is_empty() {
            let index = self.session.playback.index().min(self.frames.len() - 1);
            let frame = &self.frames[index];

            let viewer: Element<Message> = if self.current_boxes.is_empty() {
                image(frame.handle.clone()).width(Length::Fill).into()
            } else {
                let overlay = DetectionOverlay::new(
                    self.current_boxes.clone(),
                    self.current_labels.clone(),
                    self.categories(),
                    frame.width,
                    frame.height,
                );
                Stack::with_children(vec![
                    image(frame.handle.clone()).width(Length::Fill).into(),
                    canvas(overlay)
                        .width(Length::Fill)
                        .height(Length::Fill)
                        .into(),
                ])
                .into()
            };

            col = col.push(viewer);
            col = col.push(text(format!("Frame: {}, idx: {}", frame.file_name, index)).size(13));
            col = col.push(
                row![
                    button("Play Timelapse").on_press(Message::PlayTimelapse).padding(8),
                    button("Resume Timelapse").on_press(Message::ResumeTimelapse).padding(8),
                    button("Stop Timelapse").on_press(Message::StopTimelapse).padding(8),
                ]
                .spacing(10),
            );
        }

        col.push(text(&self.status).size(13))
    }

    /// Column 2: the chart, the frame slider, and the clear button
    fn chart_column(&self) -> Column<Message> {
        let mut col = column![].spacing(12);

        match (&self.well, &self.table) {
            (Some(well), Some(table)) => {
                let chart = SeriesChart::new(self.chart_rows(well), table.categories().to_vec());
                col = col.push(text("Cell Counting Result Over Time").size(18));
                col = col.push(
                    canvas(chart)
                        .width(Length::Fill)
                        .height(Length::Fixed(380.0)),
                );
            }
            (Some(_), None) => {
                col = col.push(text("No measurement data available for this run.").size(15));
            }
            _ => {
                col = col.push(text("Select a well to view its chart.").size(15));
            }
        }

        if !self.frames.is_empty() {
            let last = (self.frames.len() - 1) as u32;
            let current = self.session.playback.index().min(self.frames.len() - 1) as u32;
            col = col.push(text("Select Frame").size(14));
            col = col.push(slider(0..=last, current, Message::FrameSliderMoved));
        }

        col.push(button("Clear Data").on_press(Message::ClearData).padding(8))
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        // Side-by-side columns, chart side twice as wide
        let content = row![
            container(self.viewer_column()).width(Length::FillPortion(1)),
            container(self.chart_column()).width(Length::FillPortion(2)),
        ]
        .spacing(20)
        .padding(20);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    /// While playing, a tick per playback interval drives frame advancement.
    /// The subscription disappears while idle, so a stop takes effect before
    /// the next frame is processed.
    fn subscription(&self) -> Subscription<Message> {
        if self.session.playback.is_playing() {
            iced::time::every(self.config.playback_interval).map(|_| Message::Tick)
        } else {
            Subscription::none()
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    // load the .env file before anything reads the environment
    dotenvy::dotenv().ok();
    env_logger::init();

    iced::application(
        "Cell Counting Timelapse Viewer",
        TimelapseViewer::update,
        TimelapseViewer::view,
    )
    .subscription(TimelapseViewer::subscription)
    .theme(TimelapseViewer::theme)
    .window_size((1280.0, 800.0))
    .centered()
    .run_with(TimelapseViewer::new)
}
