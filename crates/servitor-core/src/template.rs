//! Control-artifact templates and token substitution.
//!
//! Rendering is a pure function of the descriptor and the template family.
//! Substitution is one left-to-right pass over the template: a value that
//! happens to look like a token is copied through untouched.

use std::path::Path;

use crate::descriptor::ServiceDescriptor;
use crate::error::{Result, ServiceError};

/// Shape of the generated artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateFamily {
    /// systemd service unit.
    SystemdUnit,
    /// LSB init script with an inline start/stop polling loop.
    LsbInitScript,
    /// Init script that delegates to `start-stop-daemon`.
    MinimalInitScript,
}

impl TemplateFamily {
    /// Returns the raw template text.
    #[must_use]
    pub const fn template(&self) -> &'static str {
        match self {
            Self::SystemdUnit => SYSTEMD_UNIT,
            Self::LsbInitScript => LSB_INIT_SCRIPT,
            Self::MinimalInitScript => MINIMAL_INIT_SCRIPT,
        }
    }

    /// Separator placed between dependency names.
    ///
    /// Init script headers list dependencies on one line; systemd gets one
    /// `Requires=` directive per dependency.
    #[must_use]
    pub const fn dependency_separator(&self) -> &'static str {
        match self {
            Self::SystemdUnit => "\nRequires=",
            Self::LsbInitScript | Self::MinimalInitScript => " ",
        }
    }
}

/// Placeholder tokens recognised in templates.
pub mod tokens {
    /// Service name.
    pub const NAME: &str = "##NAME##";
    /// Executable path.
    pub const NODE_PATH: &str = "##NODE_PATH##";
    /// Quoted executable arguments.
    pub const NODE_ARGS: &str = "##NODE_ARGS##";
    /// Program path.
    pub const PROGRAM_PATH: &str = "##PROGRAM_PATH##";
    /// Quoted program arguments.
    pub const PROGRAM_ARGS: &str = "##PROGRAM_ARGS##";
    /// Joined dependency names.
    pub const DEPENDENCIES: &str = "##DEPENDENCIES##";
    /// Space-joined runlevels.
    pub const RUN_LEVELS_ARR: &str = "##RUN_LEVELS_ARR##";
    /// Concatenated runlevels.
    pub const RUN_LEVELS_STR: &str = "##RUN_LEVELS_STR##";
    /// systemd install target.
    pub const SYSTEMD_WANTED_BY: &str = "##SYSTEMD_WANTED_BY##";
}

/// systemd unit template.
pub const SYSTEMD_UNIT: &str = "[Unit]
Description=##NAME##
After=network.target
Requires=##DEPENDENCIES##

[Service]
Type=simple
StandardOutput=null
StandardError=null
UMask=0007
ExecStart=##NODE_PATH## ##NODE_ARGS## ##PROGRAM_PATH## ##PROGRAM_ARGS##

[Install]
WantedBy=##SYSTEMD_WANTED_BY##
";

/// LSB init script template.
pub const LSB_INIT_SCRIPT: &str = r###"#!/bin/bash

### BEGIN INIT INFO
# Provides:          ##NAME##
# Required-Start:    ##DEPENDENCIES##
# Required-Stop:
# Default-Start:     ##RUN_LEVELS_ARR##
# Default-Stop:      0 1 6
# Short-Description: Start ##NAME## at boot time
# Description:       Enable ##NAME## service.
### END INIT INFO

# chkconfig:   ##RUN_LEVELS_STR## 99 1
# description: ##NAME##

umask 0007

set_pid () {
	unset PID
	_PID=`head -1 "##PROGRAM_PATH##.pid" 2>/dev/null`
	if [ $_PID ]; then
		kill -0 $_PID 2>/dev/null && PID=$_PID
	fi
}

force_reload () {
	stop
	start
}

restart () {
	stop
	start
}

start () {
	CNT=5

	set_pid

	if [ -z "$PID" ]; then
		echo starting ##NAME##

		"##NODE_PATH##" ##NODE_ARGS## "##PROGRAM_PATH##" ##PROGRAM_ARGS## >/dev/null 2>&1 &

		echo $! > "##PROGRAM_PATH##.pid"

		while [ : ]; do
			set_pid

			if [ -n "$PID" ]; then
				echo started ##NAME##
				break
			else
				if [ $CNT -gt 0 ]; then
					sleep 1
					CNT=`expr $CNT - 1`
				else
					echo ERROR - failed to start ##NAME##
					break
				fi
			fi
		done
	else
		echo ##NAME## is already started
	fi
}

status () {
	set_pid

	if [ -z "$PID" ]; then
		exit 1
	else
		exit 0
	fi
}

stop () {
	CNT=5

	set_pid

	if [ -n "$PID" ]; then
		echo stopping ##NAME##

		kill $PID

		while [ : ]; do
			set_pid

			if [ -z "$PID" ]; then
				rm "##PROGRAM_PATH##.pid"
				echo stopped ##NAME##
				break
			else
				if [ $CNT -gt 0 ]; then
					sleep 1
					CNT=`expr $CNT - 1`
				else
					echo ERROR - failed to stop ##NAME##
					break
				fi
			fi
		done
	else
		echo ##NAME## is already stopped
	fi
}

case $1 in
	force-reload)
		force_reload
		;;
	restart)
		restart
		;;
	start)
		start
		;;
	status)
		status
		;;
	stop)
		stop
		;;
	*)
		echo "usage: $0 <force-reload|restart|start|status|stop>"
		exit 1
		;;
esac
"###;

/// `start-stop-daemon` init script template.
pub const MINIMAL_INIT_SCRIPT: &str = r###"#!/bin/sh

### BEGIN INIT INFO
# Provides:          ##NAME##
# Required-Start:    ##DEPENDENCIES##
# Required-Stop:
# Default-Start:     ##RUN_LEVELS_ARR##
# Default-Stop:      0 1 6
# Short-Description: Start ##NAME## at boot time
# Description:       Enable ##NAME## service.
### END INIT INFO

PIDFILE="##PROGRAM_PATH##.pid"

umask 0007

case $1 in
	start)
		echo starting ##NAME##
		start-stop-daemon --start --quiet --background --make-pidfile --pidfile "$PIDFILE" \
			--exec "##NODE_PATH##" -- ##NODE_ARGS## "##PROGRAM_PATH##" ##PROGRAM_ARGS##
		;;
	stop)
		echo stopping ##NAME##
		start-stop-daemon --stop --quiet --retry TERM/5 --pidfile "$PIDFILE" --remove-pidfile
		;;
	restart|force-reload)
		"$0" stop
		"$0" start
		;;
	status)
		start-stop-daemon --status --pidfile "$PIDFILE"
		exit $?
		;;
	*)
		echo "usage: $0 <force-reload|restart|start|status|stop>"
		exit 1
		;;
esac
"###;

/// Token → value pairs for one rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTable {
    entries: Vec<(&'static str, String)>,
}

impl TokenTable {
    /// Builds the table for `descriptor` rendered as `family`.
    ///
    /// Fails if any substituted value contains a line break or NUL, which
    /// would split a directive or shell statement in two, or if a path is not
    /// valid UTF-8.
    pub fn new(descriptor: &ServiceDescriptor, family: TemplateFamily) -> Result<Self> {
        check_value("name", &descriptor.name)?;
        let executable = utf8_path("executable_path", &descriptor.executable_path)?;
        check_value("executable_path", executable)?;
        let program = utf8_path("program_path", &descriptor.program_path)?;
        check_value("program_path", program)?;
        for arg in descriptor.executable_args.iter().chain(&descriptor.program_args) {
            check_value("argument", arg)?;
        }
        for dep in &descriptor.dependencies {
            check_value("dependency", dep)?;
        }
        check_value("systemd_target", &descriptor.systemd_target)?;

        let dependencies = descriptor
            .dependencies
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(family.dependency_separator());

        let entries = vec![
            (tokens::NAME, descriptor.name.clone()),
            (tokens::NODE_PATH, executable.to_string()),
            (tokens::NODE_ARGS, quote_args(&descriptor.executable_args)),
            (tokens::PROGRAM_PATH, program.to_string()),
            (tokens::PROGRAM_ARGS, quote_args(&descriptor.program_args)),
            (tokens::DEPENDENCIES, dependencies),
            (tokens::RUN_LEVELS_ARR, join_run_levels(&descriptor.run_levels, " ")),
            (tokens::RUN_LEVELS_STR, join_run_levels(&descriptor.run_levels, "")),
            (tokens::SYSTEMD_WANTED_BY, descriptor.systemd_target.clone()),
        ];

        Ok(Self { entries })
    }

    /// Returns the value for `token`, if the table has one.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, v)| v.as_str())
    }

    /// Substitutes every token occurrence in `template` in a single pass.
    #[must_use]
    pub fn substitute(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(pos) = rest.find("##") {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some((token, value)) = self.entries.iter().find(|(t, _)| tail.starts_with(t)) {
                out.push_str(value);
                rest = &tail[token.len()..];
            } else {
                out.push('#');
                rest = &tail[1..];
            }
        }

        out.push_str(rest);
        out
    }
}

/// Renders `family` for `descriptor`.
pub fn render(descriptor: &ServiceDescriptor, family: TemplateFamily) -> Result<String> {
    let table = TokenTable::new(descriptor, family)?;
    Ok(table.substitute(family.template()))
}

/// Wraps each argument in double quotes and joins with spaces.
#[must_use]
pub fn quote_args(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("\"{a}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_run_levels(levels: &[u8], sep: &str) -> String {
    levels
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(sep)
}

fn utf8_path<'a>(field: &str, path: &'a Path) -> Result<&'a str> {
    path.to_str().ok_or_else(|| {
        ServiceError::render(format!("{field} {} is not valid UTF-8", path.display()))
    })
}

fn check_value(field: &str, value: &str) -> Result<()> {
    if value.contains(['\n', '\r', '\0']) {
        return Err(ServiceError::render(format!(
            "{field} {value:?} contains a line break or NUL"
        )));
    }
    Ok(())
}
