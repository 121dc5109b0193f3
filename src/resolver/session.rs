//! One long-lived `addr2line` conversation per binary module.
//!
//! Protocol: after each address we also send an empty line. addr2line
//! answers the empty line with [`RESOLVER_TERMINATOR`], which marks the end
//! of the (possibly multi-line, because of inlining) answer to the real
//! address. On open, a lone empty line probes whether the process is alive
//! at all: addr2line exits immediately when it cannot load the module.

use crate::utils::config::{DEBUG_INFO_PROBE, DEFAULT_ADDR2LINE, DEFAULT_DEMANGLER, RESOLVER_TERMINATOR};
use crate::utils::error::ResolverError;
use log::{debug, warn};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// How resolver processes are started
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Program and leading arguments of the address resolver
    pub addr2line: Vec<String>,

    /// Program and arguments of the demangling stage used in concise mode
    pub demangler: Vec<String>,

    /// Demangle through `demangler` instead of addr2line's `-C`
    pub concise: bool,

    /// Warn when a module looks stripped of debug info
    pub check_debug_info: bool,

    /// Prefix each answer with `{module} address:`
    pub verbose: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            addr2line: vec![DEFAULT_ADDR2LINE.to_string()],
            demangler: DEFAULT_DEMANGLER.iter().map(|s| s.to_string()).collect(),
            concise: false,
            check_debug_info: true,
            verbose: false,
        }
    }
}

/// Observable lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Resolver processes are being started
    Opening,
    /// Started; waiting for the answer to the first empty request
    Probing,
    /// Answering requests
    Ready,
    /// Could not be started or stopped answering; serving fallbacks
    Unavailable,
}

/// Live pipes to the resolver (and optional demangler) processes
struct Pipes {
    input: ChildStdin,
    output: BufReader<ChildStdout>,
    // Held so the processes live as long as the session
    _children: Vec<Child>,
}

enum State {
    Opening,
    Probing(Pipes),
    Ready(Pipes),
    Unavailable,
}

impl State {
    fn observe(&self) -> SessionState {
        match self {
            State::Opening => SessionState::Opening,
            State::Probing(_) => SessionState::Probing,
            State::Ready(_) => SessionState::Ready,
            State::Unavailable => SessionState::Unavailable,
        }
    }

    /// Advance one step of the open sequence
    fn step(self, module: &str, config: &ResolverConfig) -> State {
        match self {
            State::Opening => match Pipes::spawn(module, config) {
                Ok(pipes) => State::Probing(pipes),
                Err(e) => {
                    warn!("Cannot resolve addresses in {}: {}", module, e);
                    State::Unavailable
                }
            },
            State::Probing(mut pipes) => match pipes.probe() {
                Ok(()) => State::Ready(pipes),
                Err(e) => {
                    warn!("Cannot resolve addresses in {}: {}", module, e);
                    State::Unavailable
                }
            },
            settled => settled,
        }
    }
}

/// Resolution session for one module
pub struct Session {
    module: String,
    state: State,
}

impl Session {
    /// Start the resolver for `module` and probe it.
    ///
    /// Never fails: a resolver that cannot be started leaves the session
    /// unavailable, and every request is then answered with a fallback.
    pub fn open(module: &str, config: &ResolverConfig) -> Self {
        debug!("Opening resolver session for {}", module);

        if config.check_debug_info {
            warn_if_stripped(module);
        }

        let mut state = State::Opening;
        while matches!(state, State::Opening | State::Probing(_)) {
            state = state.step(module, config);
        }

        Self {
            module: module.to_string(),
            state,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn state(&self) -> SessionState {
        self.state.observe()
    }

    pub fn is_available(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Resolve one address into source location lines.
    ///
    /// The first line describes the innermost (possibly inlined) function;
    /// following lines are the `(inlined by)` callers.
    pub fn resolve(&mut self, address: &str) -> Vec<String> {
        let answer = match &mut self.state {
            State::Ready(pipes) => pipes.request(address),
            _ => return vec![fallback(&self.module, address)],
        };

        match answer {
            Ok(lines) => lines,
            Err(e) => {
                warn!("Resolver for {} stopped answering: {}", self.module, e);
                self.state = State::Unavailable;
                vec![fallback(&self.module, address)]
            }
        }
    }
}

/// Text returned for addresses of a module without a working resolver
pub fn fallback(module: &str, address: &str) -> String {
    format!("{} {}", module, address)
}

impl Pipes {
    fn spawn(module: &str, config: &ResolverConfig) -> Result<Self, ResolverError> {
        let options = if config.concise { "-fpia" } else { "-Cfpia" };
        let mut resolver = start(&config.addr2line, |cmd| {
            cmd.arg(options)
                .arg("-e")
                .arg(module)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
        })?;

        let input = resolver.stdin.take().ok_or(ResolverError::Closed)?;
        let resolved = resolver.stdout.take().ok_or(ResolverError::Closed)?;
        let mut children = vec![resolver];

        let output = if config.concise {
            let mut demangler = start(&config.demangler, |cmd| {
                cmd.stdin(Stdio::from(resolved)).stdout(Stdio::piped())
            })?;
            let output = demangler.stdout.take().ok_or(ResolverError::Closed)?;
            children.push(demangler);
            output
        } else {
            resolved
        };

        Ok(Self {
            input,
            output: BufReader::new(output),
            _children: children,
        })
    }

    /// Expect an answer to a lone empty request; end-of-stream means the
    /// resolver refused the module
    fn probe(&mut self) -> Result<(), ResolverError> {
        self.input.write_all(b"\n")?;
        self.input.flush()?;

        let mut line = String::new();
        if self.output.read_line(&mut line)? == 0 {
            return Err(ResolverError::Closed);
        }
        Ok(())
    }

    fn request(&mut self, address: &str) -> Result<Vec<String>, ResolverError> {
        write!(self.input, "{}\n\n", address)?;
        self.input.flush()?;

        let first = self.read_line()?;
        // addr2line echoes the address: "0x4a3b2c: fn() at file.cc:12"
        let first = match first.split_once(": ") {
            Some((_, rest)) => rest.to_string(),
            None => first,
        };

        let mut lines = vec![first];
        loop {
            let line = self.read_line()?;
            if line == RESOLVER_TERMINATOR {
                break;
            }
            lines.push(line.trim_start().to_string());
        }
        Ok(lines)
    }

    fn read_line(&mut self) -> Result<String, ResolverError> {
        let mut line = String::new();
        if self.output.read_line(&mut line)? == 0 {
            return Err(ResolverError::Closed);
        }
        Ok(line.trim_end().to_string())
    }
}

/// Spawn `argv` after letting `configure` add arguments and stdio
fn start(
    argv: &[String],
    configure: impl FnOnce(&mut Command) -> &mut Command,
) -> Result<Child, ResolverError> {
    let (program, leading) = argv.split_first().ok_or(ResolverError::Closed)?;

    let mut command = Command::new(program);
    command.args(leading).stderr(Stdio::null());
    configure(&mut command)
        .spawn()
        .map_err(|source| ResolverError::Spawn {
            command: program.clone(),
            source,
        })
}

/// Warn once when `file` describes the module as an ELF object without
/// debug info. Probe failures are ignored; the resolver will report them.
fn warn_if_stripped(module: &str) {
    let Ok(output) = Command::new(DEBUG_INFO_PROBE)
        .arg(module)
        .stderr(Stdio::null())
        .output()
    else {
        return;
    };

    let description = String::from_utf8_lossy(&output.stdout);
    // The path itself may contain "debug_info"; only look past it
    let details = description.get(module.len()..).unwrap_or(&description);
    if description.contains("ELF") && !details.contains("debug_info") {
        warn!(
            "{} has no debug info, locations will be incomplete: {}",
            module,
            description.trim()
        );
    }
}
