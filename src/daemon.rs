use std::io;
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::ptr;

/// Signals ignored by the daemon, restored to their default in children.
pub const IGNORED_SIGNALS: [libc::c_int; 5] =
    [libc::SIGCHLD, libc::SIGTSTP, libc::SIGTTOU, libc::SIGTTIN, libc::SIGHUP];

/// Command execution.
pub trait Launcher {
    /// Start a command, with the program as the first element.
    fn launch(&mut self, command: &[&str]) -> io::Result<()>;
}

/// Launcher for disowned children.
///
/// Children run in their own session and do not inherit the X11 connection.
/// They are never waited on, `SIGCHLD` must be ignored to avoid zombies.
#[derive(Debug, Copy, Clone)]
pub struct DetachedLauncher {
    connection_fd: RawFd,
}

impl DetachedLauncher {
    pub fn new(connection_fd: RawFd) -> Self {
        Self { connection_fd }
    }
}

impl Launcher for DetachedLauncher {
    fn launch(&mut self, command: &[&str]) -> io::Result<()> {
        let (program, args) = match command.split_first() {
            Some(split) => split,
            None => return Ok(()),
        };

        spawn(program, args, self.connection_fd)
    }
}

/// Spawn a disowned child.
fn spawn(program: &str, args: &[&str], connection_fd: RawFd) -> io::Result<()> {
    let mut command = Command::new(program);
    command.args(args);
    command.stdin(Stdio::null());

    unsafe {
        command.pre_exec(move || {
            if connection_fd >= 0 {
                libc::close(connection_fd);
            }

            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }

            // Reset signal handlers.
            for signal in IGNORED_SIGNALS {
                libc::signal(signal, libc::SIG_DFL);
            }
            let mut signal_set = MaybeUninit::uninit();
            libc::sigemptyset(signal_set.as_mut_ptr());
            libc::sigprocmask(libc::SIG_SETMASK, signal_set.as_mut_ptr(), ptr::null_mut());

            Ok(())
        });
    }

    // Dropping the handle does not wait for the child.
    command.spawn()?;

    Ok(())
}
