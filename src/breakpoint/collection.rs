use std::sync::{Arc, Mutex, OnceLock};

use log::{debug, info, warn};

use crate::{
    breakpoint::{
        channel::SyncChannel,
        image::{CodeLocation, DebuggerController, ProgramImage},
        record::BreakpointRecord,
        request::parse_request_string,
        types::{BatchReport, Binding, Breakpoint, BreakpointState, Outcome},
    },
    metadata::{
        hierarchy::TypeHierarchy,
        resolver::{MethodResolver, Resolution},
        token::Token,
    },
    Error, Result, SessionConfig,
};

/// Report id used for records that could not be decoded
pub const UNDECODABLE_RECORD: &str = "<undecodable>";

/// Report id used for failures of the channel or the controller themselves
pub const SESSION_FAILURE: &str = "<session>";

struct Session {
    controller: Arc<dyn DebuggerController>,
    channel: Box<dyn SyncChannel>,
}

/// The set of source breakpoints of one debugging session.
///
/// All mutating operations hold one collection-wide lock for their full duration,
/// collaborator calls included. The lock is not reentrant: collaborators must not call
/// back into the collection.
///
/// # Examples
///
/// ```rust,ignore
/// let collection = BreakpointCollection::new(SessionConfig::default())?;
/// collection.initialize(controller, Box::new(channel))?;
/// collection.parse_requests("Program.cs:35:bp-1")?;
///
/// // once the runtime reports a module load
/// let report = collection.initialize_breakpoints(&image)?;
///
/// // periodically
/// let report = collection.sync_breakpoints()?;
/// ```
pub struct BreakpointCollection {
    config: SessionConfig,
    session: OnceLock<Session>,
    breakpoints: Mutex<Vec<Breakpoint>>,
}

impl BreakpointCollection {
    /// Creates an empty collection.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the configuration is invalid.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(BreakpointCollection {
            config,
            session: OnceLock::new(),
            breakpoints: Mutex::new(Vec::new()),
        })
    }

    /// The configuration this collection was created with
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Returns true once [`BreakpointCollection::initialize`] succeeded
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.session.get().is_some()
    }

    /// Attach the controller and the sync channel. Must be called exactly once.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the collection is already initialized.
    pub fn initialize(
        &self,
        controller: Arc<dyn DebuggerController>,
        channel: Box<dyn SyncChannel>,
    ) -> Result<()> {
        self.session
            .set(Session {
                controller,
                channel,
            })
            .map_err(|_| Error::InvalidArgument("collection is already initialized".to_string()))
    }

    /// Parse a request string and add the new breakpoints as `Unresolved`.
    ///
    /// Requests for an already tracked location are skipped. Returns the number of added
    /// breakpoints.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the string is malformed; nothing is added then.
    pub fn parse_requests(&self, input: &str) -> Result<usize> {
        let parsed = parse_request_string(input, &self.config)?;

        let mut breakpoints = lock!(self.breakpoints)?;
        let mut added = 0;
        for breakpoint in parsed {
            if breakpoints
                .iter()
                .any(|existing| existing.is_at(&breakpoint.source_file, breakpoint.line))
            {
                debug!(
                    target: "breakpoints",
                    "{}:{} is already tracked",
                    breakpoint.source_file,
                    breakpoint.line
                );
                continue;
            }
            breakpoints.push(breakpoint);
            added += 1;
        }
        Ok(added)
    }

    /// Try to activate every pending breakpoint against a newly loaded image.
    ///
    /// `Unresolved` breakpoints are resolved against `image`; `Reinstalling` ones retry the
    /// install of their stored binding. Breakpoints that still do not bind stay pending
    /// and are reported as [`Outcome::Pending`]; a failing breakpoint does not stop the
    /// others.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if the collection is not initialized
    /// - [`Error::LockError`] if the collection lock is poisoned
    pub fn initialize_breakpoints(&self, image: &Arc<dyn ProgramImage>) -> Result<BatchReport> {
        let session = self.session()?;
        let hierarchy = session.controller.type_hierarchy();
        let images = [Arc::clone(image)];

        let mut breakpoints = lock!(self.breakpoints)?;
        let mut report = BatchReport::new();
        for breakpoint in breakpoints.iter_mut().filter(|bp| bp.is_pending()) {
            let outcome = retry_pending(breakpoint, &images, hierarchy);
            if let Err(error) = &outcome {
                warn!(
                    target: "breakpoints",
                    "breakpoint {} failed to bind in {}: {}",
                    breakpoint.id,
                    image.name(),
                    error
                );
            }
            report.push(breakpoint.id.clone(), outcome);
        }
        Ok(report)
    }

    /// Apply one activation or deactivation request.
    ///
    /// The request is matched against tracked breakpoints by file (ignoring case) and line:
    ///
    /// | tracked | request | effect |
    /// |---|---|---|
    /// | yes | deactivate | uninstall, keep the binding; an `Unresolved` entry is removed |
    /// | yes | activate | reinstall the stored binding, or resolve if still `Unresolved` |
    /// | no | activate | insert and resolve against all loaded images |
    /// | no | deactivate | nothing |
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if the collection is not initialized, or if a new
    ///   request reuses the id of a breakpoint at another location
    /// - resolution and collaborator failures of this request
    pub fn activate_or_deactivate(&self, request: &BreakpointRecord) -> Result<Outcome> {
        let session = self.session()?;
        let mut breakpoints = lock!(self.breakpoints)?;
        apply_request(&mut breakpoints, session, request).map(|applied| applied.outcome)
    }

    /// Drain the records that are ready on the sync channel and apply each of them.
    ///
    /// At most `max_records_per_sync` records are read. A record that cannot be decoded or
    /// applied is reported and skipped. A record matching a tracked location is reported
    /// under the id of the tracked breakpoint. Afterwards, pending breakpoints are retried
    /// against all loaded images if `retry_pending_on_sync` is set, and every state change
    /// is written back to the channel if `report_state_changes` is set.
    ///
    /// # Errors
    /// - [`Error::InvalidArgument`] if the collection is not initialized
    /// - [`Error::LockError`] if the collection lock is poisoned
    pub fn sync_breakpoints(&self) -> Result<BatchReport> {
        let session = self.session()?;
        let mut breakpoints = lock!(self.breakpoints)?;
        let mut report = BatchReport::new();
        let mut changed = Vec::new();

        for _ in 0..self.config.max_records_per_sync {
            let record = match session.channel.read_breakpoint() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(error) if error.is_record_format() => {
                    warn!(target: "sync", "skipping undecodable breakpoint record: {}", error);
                    report.push(UNDECODABLE_RECORD, Err(error));
                    continue;
                }
                Err(error) => {
                    warn!(target: "sync", "sync channel failed: {}", error);
                    report.push(SESSION_FAILURE, Err(error));
                    break;
                }
            };

            match apply_request(&mut breakpoints, session, &record) {
                Ok(Applied {
                    outcome,
                    current: Some(current),
                }) => {
                    if current.id != record.id {
                        debug!(
                            target: "sync",
                            "request {} applied to breakpoint {} at {}:{}",
                            record.id,
                            current.id,
                            current.source_file,
                            current.line
                        );
                    }
                    report.push(current.id.clone(), Ok(outcome));
                    if outcome.is_state_change() {
                        changed.push(current);
                    }
                }
                Ok(Applied {
                    outcome,
                    current: None,
                }) => report.push(record.id, Ok(outcome)),
                Err(error) => {
                    warn!(
                        target: "sync",
                        "breakpoint {} at {}:{} not applied: {}",
                        record.id,
                        record.source_file,
                        record.line,
                        error
                    );
                    report.push(record.id, Err(error));
                }
            }
        }

        if self.config.retry_pending_on_sync && breakpoints.iter().any(Breakpoint::is_pending) {
            match session.controller.loaded_images() {
                Ok(images) => {
                    let hierarchy = session.controller.type_hierarchy();
                    for breakpoint in breakpoints.iter_mut().filter(|bp| bp.is_pending()) {
                        match retry_pending(breakpoint, &images, hierarchy) {
                            Ok(Outcome::Pending) => {}
                            Ok(outcome) => {
                                changed.push(breakpoint.to_record());
                                report.push(breakpoint.id.clone(), Ok(outcome));
                            }
                            Err(error) => {
                                warn!(
                                    target: "sync",
                                    "retry of breakpoint {} failed: {}",
                                    breakpoint.id,
                                    error
                                );
                                report.push(breakpoint.id.clone(), Err(error));
                            }
                        }
                    }
                }
                Err(error) => {
                    warn!(target: "sync", "loaded images unavailable: {}", error);
                    report.push(SESSION_FAILURE, Err(error));
                }
            }
        }

        if self.config.report_state_changes {
            for record in changed {
                if let Err(error) = session.channel.write_breakpoint(&record) {
                    warn!(
                        target: "sync",
                        "state of breakpoint {} not reported: {}",
                        record.id,
                        error
                    );
                    report.push(record.id, Err(error));
                }
            }
        }

        debug!(target: "sync", "sync processed {} items", report.len());
        Ok(report)
    }

    /// A copy of all breakpoints, in insertion order.
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the collection lock is poisoned.
    pub fn snapshot(&self) -> Result<Vec<Breakpoint>> {
        Ok(lock!(self.breakpoints)?.clone())
    }

    /// Run `f` on the breakpoints while holding the collection lock.
    ///
    /// `f` must not call back into the collection.
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the collection lock is poisoned.
    pub fn with_breakpoints<T>(&self, f: impl FnOnce(&[Breakpoint]) -> T) -> Result<T> {
        let breakpoints = lock!(self.breakpoints)?;
        Ok(f(&breakpoints))
    }

    /// Number of tracked breakpoints
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the collection lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(lock!(self.breakpoints)?.len())
    }

    /// Returns true if no breakpoint is tracked
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the collection lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(lock!(self.breakpoints)?.is_empty())
    }

    /// The breakpoint with the given id
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the collection lock is poisoned.
    pub fn get(&self, id: &str) -> Result<Option<Breakpoint>> {
        Ok(find_by_id(&lock!(self.breakpoints)?, id).cloned())
    }

    /// Activated breakpoints installed at `method_token` + `il_offset`, used when the
    /// runtime reports a hit.
    ///
    /// # Errors
    /// Returns [`Error::LockError`] if the collection lock is poisoned.
    pub fn breakpoints_at(&self, method_token: Token, il_offset: u32) -> Result<Vec<Breakpoint>> {
        let target = CodeLocation {
            method_token,
            il_offset,
        };
        Ok(lock!(self.breakpoints)?
            .iter()
            .filter(|bp| match &bp.state {
                BreakpointState::Activated(binding) => binding.location == target,
                _ => false,
            })
            .cloned()
            .collect())
    }

    /// Remove a breakpoint, uninstalling it first if it is activated.
    ///
    /// # Errors
    /// Returns the uninstall failure; the breakpoint stays tracked then.
    pub fn remove(&self, id: &str) -> Result<Option<Breakpoint>> {
        let mut breakpoints = lock!(self.breakpoints)?;
        let Some(position) = breakpoints.iter().position(|bp| bp.id == id) else {
            return Ok(None);
        };

        if let BreakpointState::Activated(binding) = &breakpoints[position].state {
            binding.image.uninstall(&binding.location)?;
        }

        let removed = breakpoints.remove(position);
        info!(target: "breakpoints", "breakpoint {} removed", removed.id);
        Ok(Some(removed))
    }

    fn session(&self) -> Result<&Session> {
        self.session
            .get()
            .ok_or_else(|| Error::InvalidArgument("collection is not initialized".to_string()))
    }
}

fn find_by_id<'a>(breakpoints: &'a [Breakpoint], id: &str) -> Option<&'a Breakpoint> {
    breakpoints.iter().find(|bp| bp.id == id)
}

/// Result of one applied request.
struct Applied {
    outcome: Outcome,
    /// State of the tracked breakpoint the request matched, after the request
    current: Option<BreakpointRecord>,
}

/// Applies one request; the caller holds the collection lock.
fn apply_request(
    breakpoints: &mut Vec<Breakpoint>,
    session: &Session,
    request: &BreakpointRecord,
) -> Result<Applied> {
    let position = breakpoints
        .iter()
        .position(|bp| bp.is_at(&request.source_file, request.line));

    let (position, outcome) = match (position, request.activated) {
        (Some(position), false) => {
            let tracked = breakpoints[position].to_record();
            let outcome = deactivate(breakpoints, position)?;
            if outcome == Outcome::Removed {
                return Ok(Applied {
                    outcome,
                    current: Some(tracked),
                });
            }
            (position, outcome)
        }
        (Some(position), true) => {
            let breakpoint = &mut breakpoints[position];
            if breakpoint.is_unresolved() && request.method.is_some() {
                breakpoint.method.clone_from(&request.method);
            }
            (position, activate(breakpoint, session)?)
        }
        (None, true) => {
            if let Some(existing) = find_by_id(breakpoints, &request.id) {
                return Err(Error::InvalidArgument(format!(
                    "breakpoint id {} is already used at {}:{}",
                    request.id, existing.source_file, existing.line
                )));
            }

            breakpoints.push(Breakpoint::from_record(request));
            let last = breakpoints.len() - 1;
            (last, activate(&mut breakpoints[last], session)?)
        }
        (None, false) => {
            debug!(
                target: "breakpoints",
                "nothing to deactivate at {}:{}",
                request.source_file,
                request.line
            );
            return Ok(Applied {
                outcome: Outcome::Unchanged,
                current: None,
            });
        }
    };

    Ok(Applied {
        outcome,
        current: Some(breakpoints[position].to_record()),
    })
}

fn activate(breakpoint: &mut Breakpoint, session: &Session) -> Result<Outcome> {
    match &breakpoint.state {
        BreakpointState::Activated(_) => Ok(Outcome::Unchanged),
        BreakpointState::Deactivated(binding) | BreakpointState::Reinstalling(binding) => {
            let binding = binding.clone();
            reinstall(breakpoint, binding)
        }
        BreakpointState::Unresolved => {
            let images = session.controller.loaded_images()?;
            activate_pending(breakpoint, &images, session.controller.type_hierarchy())
        }
    }
}

/// Installs a breakpoint at its stored binding; a deferred install leaves it `Reinstalling`.
fn reinstall(breakpoint: &mut Breakpoint, binding: Binding) -> Result<Outcome> {
    if !binding.image.install(&binding.location)? {
        debug!(
            target: "breakpoints",
            "breakpoint {} waits for {} to load in {}",
            breakpoint.id,
            binding.location,
            binding.image.name()
        );
        breakpoint.state = BreakpointState::Reinstalling(binding);
        return Ok(Outcome::Pending);
    }

    info!(
        target: "breakpoints",
        "breakpoint {} reactivated at {}",
        breakpoint.id,
        binding.location
    );
    breakpoint.state = BreakpointState::Activated(binding);
    Ok(Outcome::Activated)
}

fn deactivate(breakpoints: &mut Vec<Breakpoint>, position: usize) -> Result<Outcome> {
    if breakpoints[position].is_unresolved() {
        let removed = breakpoints.remove(position);
        info!(
            target: "breakpoints",
            "unresolved breakpoint {} dropped",
            removed.id
        );
        return Ok(Outcome::Removed);
    }

    let breakpoint = &mut breakpoints[position];
    let binding = match &breakpoint.state {
        BreakpointState::Activated(binding) => {
            let binding = binding.clone();
            binding.image.uninstall(&binding.location)?;
            binding
        }
        // never installed, nothing to uninstall
        BreakpointState::Reinstalling(binding) => binding.clone(),
        _ => return Ok(Outcome::Unchanged),
    };

    info!(
        target: "breakpoints",
        "breakpoint {} deactivated at {}",
        breakpoint.id,
        binding.location
    );
    breakpoint.state = BreakpointState::Deactivated(binding);
    Ok(Outcome::Deactivated)
}

/// Retries a pending breakpoint: resolves an `Unresolved` one against `images`, reinstalls
/// a `Reinstalling` one at its binding.
fn retry_pending(
    breakpoint: &mut Breakpoint,
    images: &[Arc<dyn ProgramImage>],
    hierarchy: &dyn TypeHierarchy,
) -> Result<Outcome> {
    match &breakpoint.state {
        BreakpointState::Reinstalling(binding) => {
            let binding = binding.clone();
            reinstall(breakpoint, binding)
        }
        BreakpointState::Unresolved => activate_pending(breakpoint, images, hierarchy),
        BreakpointState::Activated(_) | BreakpointState::Deactivated(_) => Ok(Outcome::Unchanged),
    }
}

/// Binds an `Unresolved` breakpoint to the first image that accepts it.
fn activate_pending(
    breakpoint: &mut Breakpoint,
    images: &[Arc<dyn ProgramImage>],
    hierarchy: &dyn TypeHierarchy,
) -> Result<Outcome> {
    for image in images {
        if let Some(binding) = bind(breakpoint, image, hierarchy)? {
            info!(
                target: "breakpoints",
                "breakpoint {} activated at {} in {}",
                breakpoint.id,
                binding.location,
                image.name()
            );
            breakpoint.state = BreakpointState::Activated(binding);
            return Ok(Outcome::Activated);
        }
    }

    debug!(
        target: "breakpoints",
        "breakpoint {} at {}:{} is pending",
        breakpoint.id,
        breakpoint.source_file,
        breakpoint.line
    );
    Ok(Outcome::Pending)
}

fn bind(
    breakpoint: &Breakpoint,
    image: &Arc<dyn ProgramImage>,
    hierarchy: &dyn TypeHierarchy,
) -> Result<Option<Binding>> {
    let Some(source) = image.locate(&breakpoint.source_file, breakpoint.line)? else {
        return Ok(None);
    };

    let location = match &breakpoint.method {
        None => source.code_location(),
        Some(method) => {
            let resolver = MethodResolver::new(image.metadata(), hierarchy);
            match resolver.resolve(source.type_token, &method.name, &method.argument_types)? {
                Resolution::Matched(info) => CodeLocation {
                    method_token: info.method_token,
                    il_offset: 0,
                },
                Resolution::NoMatch => return Ok(None),
            }
        }
    };

    if !image.install(&location)? {
        debug!(
            target: "breakpoints",
            "{} is not loaded yet in {}",
            location,
            image.name()
        );
        return Ok(None);
    }

    Ok(Some(Binding {
        image: Arc::clone(image),
        location,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        breakpoint::{image::SourceLocation, types::MethodRequest},
        metadata::method::MethodAttributes,
        test::{
            init_logging, MemoryChannel, MetadataBuilder, MockController, MockImage,
            SignatureBuilder,
        },
    };

    const PROGRAM: Token = Token(0x0200_0002);

    fn program_image() -> Arc<MockImage> {
        Arc::new(
            MockImage::new("App.dll")
                .with_line(
                    "Program.cs",
                    10,
                    SourceLocation {
                        type_token: PROGRAM,
                        method_token: Token::method_def(1),
                        il_offset: 0x10,
                    },
                )
                .with_line(
                    "Program.cs",
                    20,
                    SourceLocation {
                        type_token: PROGRAM,
                        method_token: Token::method_def(2),
                        il_offset: 0x04,
                    },
                ),
        )
    }

    fn setup(images: Vec<Arc<MockImage>>) -> (BreakpointCollection, Arc<MemoryChannel>) {
        init_logging();
        let collection = BreakpointCollection::new(SessionConfig::default()).unwrap();
        let channel = Arc::new(MemoryChannel::new());
        collection
            .initialize(
                Arc::new(MockController::new(images)),
                Box::new(Arc::clone(&channel)),
            )
            .unwrap();
        (collection, channel)
    }

    #[test]
    fn test_requires_initialization() {
        let collection = BreakpointCollection::new(SessionConfig::default()).unwrap();
        assert!(!collection.is_initialized());
        assert!(matches!(
            collection.sync_breakpoints(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            collection.activate_or_deactivate(&BreakpointRecord::new("a", "A.cs", 1, true)),
            Err(Error::InvalidArgument(_))
        ));

        let (collection, _) = setup(vec![]);
        let again = collection.initialize(
            Arc::new(MockController::new(vec![])),
            Box::new(MemoryChannel::new()),
        );
        assert!(matches!(again, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SessionConfig::default().with_separators(";", ";");
        assert!(matches!(
            BreakpointCollection::new(config),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_initialize_breakpoints_partial_success() {
        let image = program_image();
        let (collection, _) = setup(vec![]);
        assert_eq!(
            collection
                .parse_requests("Program.cs:10:a;Program.cs:20:b;Other.cs:5:c;program.cs:10:dup")
                .unwrap(),
            3
        );

        let dyn_image: Arc<dyn ProgramImage> = image.clone();
        let report = collection.initialize_breakpoints(&dyn_image).unwrap();
        assert_eq!(report.count(Outcome::Activated), 2);
        assert!(matches!(report.outcome_of("c"), Some(Ok(Outcome::Pending))));
        assert!(report.is_success());

        let a = collection.get("a").unwrap().unwrap();
        assert!(a.is_activated());
        assert_eq!(a.resolved_method_token(), Some(Token::method_def(1)));
        assert_eq!(image.installed().len(), 2);

        let hits = collection.breakpoints_at(Token::method_def(2), 0x04).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "b");
    }

    #[test]
    fn test_activation_cycle_reuses_binding() {
        let image = program_image();
        let (collection, _) = setup(vec![image.clone()]);

        let on = BreakpointRecord::new("a", "Program.cs", 10, true);
        let off = BreakpointRecord::new("a", "PROGRAM.CS", 10, false);

        assert_eq!(collection.activate_or_deactivate(&on).unwrap(), Outcome::Activated);
        assert_eq!(collection.activate_or_deactivate(&on).unwrap(), Outcome::Unchanged);
        assert_eq!(collection.activate_or_deactivate(&off).unwrap(), Outcome::Deactivated);
        assert_eq!(collection.activate_or_deactivate(&off).unwrap(), Outcome::Unchanged);

        let deactivated = collection.get("a").unwrap().unwrap();
        assert!(matches!(deactivated.state, BreakpointState::Deactivated(_)));
        assert_eq!(deactivated.resolved_method_token(), Some(Token::method_def(1)));

        // the line table is not consulted again
        image.forget_lines();
        assert_eq!(collection.activate_or_deactivate(&on).unwrap(), Outcome::Activated);
        assert_eq!(image.installed().len(), 2);
        assert_eq!(image.uninstalled().len(), 1);
        assert_eq!(collection.len().unwrap(), 1);
    }

    #[test]
    fn test_deferred_reactivation_is_retried_on_sync() {
        let image = program_image();
        let (collection, channel) = setup(vec![image.clone()]);

        let on = BreakpointRecord::new("a", "Program.cs", 10, true);
        let off = BreakpointRecord::new("a", "Program.cs", 10, false);
        collection.activate_or_deactivate(&on).unwrap();
        collection.activate_or_deactivate(&off).unwrap();

        image.defer_installs();
        assert_eq!(collection.activate_or_deactivate(&on).unwrap(), Outcome::Pending);
        let parked = collection.get("a").unwrap().unwrap();
        assert!(parked.is_pending());
        assert!(matches!(parked.state, BreakpointState::Reinstalling(_)));
        assert_eq!(parked.resolved_method_token(), Some(Token::method_def(1)));

        // still deferred, nothing to report
        assert!(collection.sync_breakpoints().unwrap().is_empty());

        image.accept_installs();
        let report = collection.sync_breakpoints().unwrap();
        assert!(matches!(report.outcome_of("a"), Some(Ok(Outcome::Activated))));
        assert!(collection.get("a").unwrap().unwrap().is_activated());
        assert_eq!(channel.outbound(), vec![on]);
        assert_eq!(image.installed().len(), 2);
    }

    #[test]
    fn test_deferred_reactivation_is_retried_on_module_load() {
        let image = program_image();
        let (collection, _) = setup(vec![image.clone()]);
        collection
            .activate_or_deactivate(&BreakpointRecord::new("a", "Program.cs", 20, true))
            .unwrap();
        collection
            .activate_or_deactivate(&BreakpointRecord::new("a", "Program.cs", 20, false))
            .unwrap();

        image.defer_installs();
        collection
            .activate_or_deactivate(&BreakpointRecord::new("a", "Program.cs", 20, true))
            .unwrap();

        image.accept_installs();
        let dyn_image: Arc<dyn ProgramImage> = image.clone();
        let report = collection.initialize_breakpoints(&dyn_image).unwrap();
        assert!(matches!(report.outcome_of("a"), Some(Ok(Outcome::Activated))));
        assert_eq!(
            collection.breakpoints_at(Token::method_def(2), 0x04).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_deactivating_a_deferred_reactivation() {
        let image = program_image();
        let (collection, _) = setup(vec![image.clone()]);
        let on = BreakpointRecord::new("a", "Program.cs", 10, true);
        let off = BreakpointRecord::new("a", "Program.cs", 10, false);
        collection.activate_or_deactivate(&on).unwrap();
        collection.activate_or_deactivate(&off).unwrap();
        image.defer_installs();
        collection.activate_or_deactivate(&on).unwrap();

        assert_eq!(collection.activate_or_deactivate(&off).unwrap(), Outcome::Deactivated);
        let entry = collection.get("a").unwrap().unwrap();
        assert!(matches!(entry.state, BreakpointState::Deactivated(_)));
        assert!(!entry.is_pending());
        // it was never installed again, so there is nothing more to uninstall
        assert_eq!(image.uninstalled().len(), 1);

        image.accept_installs();
        assert!(collection.sync_breakpoints().unwrap().is_empty());
        assert!(!collection.get("a").unwrap().unwrap().is_activated());
    }

    #[test]
    fn test_sync_reports_the_tracked_breakpoint_for_a_location_match() {
        let (collection, channel) = setup(vec![program_image()]);
        collection
            .activate_or_deactivate(&BreakpointRecord::new("bp1", "Program.cs", 10, true))
            .unwrap();

        channel.push_inbound(BreakpointRecord::new("bp2", "PROGRAM.cs", 10, false));
        let report = collection.sync_breakpoints().unwrap();

        assert!(matches!(report.outcome_of("bp1"), Some(Ok(Outcome::Deactivated))));
        assert!(report.outcome_of("bp2").is_none());
        assert_eq!(
            channel.outbound(),
            vec![BreakpointRecord::new("bp1", "Program.cs", 10, false)]
        );
        assert!(collection.get("bp2").unwrap().is_none());
    }

    #[test]
    fn test_sync_reports_removed_unresolved_breakpoint() {
        let (collection, channel) = setup(vec![]);
        collection.parse_requests("Late.cs:3:x").unwrap();

        channel.push_inbound(BreakpointRecord::new("other", "late.cs", 3, false));
        let report = collection.sync_breakpoints().unwrap();

        assert!(matches!(report.outcome_of("x"), Some(Ok(Outcome::Removed))));
        assert_eq!(
            channel.outbound(),
            vec![BreakpointRecord::new("x", "Late.cs", 3, false)]
        );
        assert!(collection.is_empty().unwrap());
    }

    #[test]
    fn test_deactivating_untracked_is_a_no_op() {
        let (collection, _) = setup(vec![program_image()]);
        collection
            .activate_or_deactivate(&BreakpointRecord::new("a", "Program.cs", 10, true))
            .unwrap();
        let before = collection.snapshot().unwrap();

        let outcome = collection
            .activate_or_deactivate(&BreakpointRecord::new("zzz", "Nowhere.cs", 1, false))
            .unwrap();
        assert_eq!(outcome, Outcome::Unchanged);

        let after = collection.snapshot().unwrap();
        assert_eq!(after.len(), before.len());
        assert!(after[0].is_activated());
    }

    #[test]
    fn test_deactivating_unresolved_removes_it() {
        let (collection, _) = setup(vec![]);
        collection.parse_requests("Late.cs:3:x").unwrap();
        let outcome = collection
            .activate_or_deactivate(&BreakpointRecord::new("x", "Late.cs", 3, false))
            .unwrap();
        assert_eq!(outcome, Outcome::Removed);
        assert!(collection.is_empty().unwrap());
    }

    #[test]
    fn test_new_activation_stays_pending_until_loaded() {
        let image = Arc::new(program_image().as_ref().clone().deferring_installs());
        let (collection, _) = setup(vec![image.clone()]);

        let record = BreakpointRecord::new("a", "Program.cs", 20, true);
        assert_eq!(collection.activate_or_deactivate(&record).unwrap(), Outcome::Pending);
        assert!(collection.get("a").unwrap().unwrap().is_pending());

        image.accept_installs();
        assert_eq!(collection.activate_or_deactivate(&record).unwrap(), Outcome::Activated);
    }

    #[test]
    fn test_duplicate_id_at_other_location() {
        let (collection, _) = setup(vec![program_image()]);
        collection
            .activate_or_deactivate(&BreakpointRecord::new("a", "Program.cs", 10, true))
            .unwrap();
        let err = collection
            .activate_or_deactivate(&BreakpointRecord::new("a", "Program.cs", 20, true))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(collection.len().unwrap(), 1);
    }

    #[test]
    fn test_signature_binding() {
        let metadata = MetadataBuilder::new()
            .with_method(
                PROGRAM,
                Token::method_def(5),
                "Add",
                MethodAttributes::STATIC,
                SignatureBuilder::static_method().returns_i4().param_i4().build(),
            )
            .with_method(
                PROGRAM,
                Token::method_def(6),
                "Add",
                MethodAttributes::STATIC,
                SignatureBuilder::static_method()
                    .returns_i4()
                    .param_i4()
                    .param_i4()
                    .build(),
            )
            .build();
        let image = Arc::new(program_image().as_ref().clone().with_metadata(metadata));
        let (collection, _) = setup(vec![image.clone()]);

        let record = BreakpointRecord::new("sig", "Program.cs", 10, true)
            .with_method(MethodRequest::new("Add", ["int", "int"]));
        assert_eq!(collection.activate_or_deactivate(&record).unwrap(), Outcome::Activated);

        let bound = collection.get("sig").unwrap().unwrap();
        let binding = bound.binding().unwrap();
        assert_eq!(binding.location.method_token, Token::method_def(6));
        assert_eq!(binding.location.il_offset, 0);

        let miss = BreakpointRecord::new("miss", "Program.cs", 20, true)
            .with_method(MethodRequest::new("Add", ["string"]));
        assert_eq!(collection.activate_or_deactivate(&miss).unwrap(), Outcome::Pending);
    }

    #[test]
    fn test_signature_binding_uses_controller_hierarchy() {
        let metadata = MetadataBuilder::new()
            .with_type(Token::type_def(7), "Zoo.Animal")
            .with_method(
                PROGRAM,
                Token::method_def(8),
                "Feed",
                MethodAttributes::empty(),
                SignatureBuilder::instance_method()
                    .returns_void()
                    .param_class(Token::type_def(7))
                    .build(),
            )
            .build();
        let image = Arc::new(program_image().as_ref().clone().with_metadata(metadata));
        let controller = Arc::new(MockController::new(vec![image]));
        let collection = BreakpointCollection::new(SessionConfig::default()).unwrap();
        collection
            .initialize(controller.clone(), Box::new(MemoryChannel::new()))
            .unwrap();

        let request = BreakpointRecord::new("feed", "Program.cs", 10, true)
            .with_method(MethodRequest::new("Feed", ["Zoo.Dog"]));
        assert_eq!(collection.activate_or_deactivate(&request).unwrap(), Outcome::Pending);

        controller.register_type("Zoo.Dog", ["Zoo.Animal"]);
        assert_eq!(collection.activate_or_deactivate(&request).unwrap(), Outcome::Activated);
        assert_eq!(
            collection.get("feed").unwrap().unwrap().resolved_method_token(),
            Some(Token::method_def(8))
        );
    }

    #[test]
    fn test_bad_signature_does_not_stop_batch() {
        let metadata = MetadataBuilder::new()
            .with_method(
                PROGRAM,
                Token::method_def(5),
                "Broken",
                MethodAttributes::STATIC,
                // two parameters declared, one present
                vec![0x00, 0x02, 0x01, 0x08],
            )
            .build();
        let image = Arc::new(program_image().as_ref().clone().with_metadata(metadata));
        let (collection, channel) = setup(vec![image]);

        channel.push_inbound(
            BreakpointRecord::new("bad", "Program.cs", 10, true)
                .with_method(MethodRequest::new("Broken", ["int", "int"])),
        );
        channel.push_inbound(BreakpointRecord::new("good", "Program.cs", 20, true));

        let report = collection.sync_breakpoints().unwrap();
        assert!(report
            .outcome_of("bad")
            .unwrap()
            .as_ref()
            .unwrap_err()
            .is_signature_format());
        assert!(matches!(report.outcome_of("good"), Some(Ok(Outcome::Activated))));

        // the failed breakpoint is kept and retried, so it appears again on the next sync
        assert!(collection.get("bad").unwrap().unwrap().is_pending());
        let retry = collection.sync_breakpoints().unwrap();
        assert!(retry.outcome_of("bad").unwrap().is_err());
    }

    #[test]
    fn test_sync_reports_and_retries() {
        let image = program_image();
        let (collection, channel) = setup(vec![]);
        let controller_images = vec![image.clone()];

        channel.push_inbound(BreakpointRecord::new("a", "Program.cs", 10, true));
        channel.push_garbage();
        channel.push_inbound(BreakpointRecord::new("ghost", "None.cs", 1, false));

        let report = collection.sync_breakpoints().unwrap();
        assert_eq!(report.len(), 3);
        assert!(matches!(report.outcome_of("a"), Some(Ok(Outcome::Pending))));
        assert!(matches!(report.outcome_of("ghost"), Some(Ok(Outcome::Unchanged))));
        assert!(report
            .outcome_of(UNDECODABLE_RECORD)
            .unwrap()
            .as_ref()
            .unwrap_err()
            .is_record_format());
        assert!(channel.outbound().is_empty());

        // a module load later makes the pending breakpoint bindable
        let (collection_with_image, channel) = setup(controller_images);
        channel.push_inbound(BreakpointRecord::new("a", "Program.cs", 10, true));
        let report = collection_with_image.sync_breakpoints().unwrap();
        assert!(matches!(report.outcome_of("a"), Some(Ok(Outcome::Activated))));
        assert_eq!(channel.outbound(), vec![BreakpointRecord::new("a", "Program.cs", 10, true)]);
        drop(collection);
    }

    #[test]
    fn test_sync_retry_picks_up_new_images() {
        let image = program_image();
        let controller = Arc::new(MockController::new(vec![]));
        let channel = Arc::new(MemoryChannel::new());
        let collection = BreakpointCollection::new(SessionConfig::default()).unwrap();
        collection
            .initialize(controller.clone(), Box::new(Arc::clone(&channel)))
            .unwrap();
        collection.parse_requests("Program.cs:20:late").unwrap();

        let report = collection.sync_breakpoints().unwrap();
        assert!(report.is_empty());

        controller.load(image);
        let report = collection.sync_breakpoints().unwrap();
        assert!(matches!(report.outcome_of("late"), Some(Ok(Outcome::Activated))));
        assert!(channel.outbound()[0].activated);
    }

    #[test]
    fn test_sync_respects_drain_bound() {
        init_logging();
        let collection = BreakpointCollection::new(
            SessionConfig::default()
                .with_max_records_per_sync(2)
                .with_retry_pending_on_sync(false)
                .with_report_state_changes(false),
        )
        .unwrap();
        let channel = Arc::new(MemoryChannel::new());
        collection
            .initialize(
                Arc::new(MockController::new(vec![program_image()])),
                Box::new(Arc::clone(&channel)),
            )
            .unwrap();

        for line in [10, 20, 30] {
            channel.push_inbound(BreakpointRecord::new(format!("bp{line}"), "Program.cs", line, true));
        }

        assert_eq!(collection.sync_breakpoints().unwrap().len(), 2);
        assert_eq!(collection.sync_breakpoints().unwrap().len(), 1);
        assert!(channel.outbound().is_empty());
        // line 30 has no code and is not retried
        assert!(collection.get("bp30").unwrap().unwrap().is_pending());
    }

    #[test]
    fn test_remove() {
        let image = program_image();
        let (collection, _) = setup(vec![image.clone()]);
        collection
            .activate_or_deactivate(&BreakpointRecord::new("a", "Program.cs", 10, true))
            .unwrap();

        let removed = collection.remove("a").unwrap().unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(image.uninstalled().len(), 1);
        assert!(collection.remove("a").unwrap().is_none());
        assert!(collection.with_breakpoints(|all| all.is_empty()).unwrap());
    }
}
