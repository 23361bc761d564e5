//! Interactive roster menu.
//!
//! # Responsibility
//! - Map the fixed menu choices 1:1 onto roster service operations.
//! - Report outcomes to the operator and keep the loop alive on failures.
//!
//! # Invariants
//! - A failed selection never ends the loop; only `0` or end of input does.
//! - Operator text goes to `output`; diagnostics go through `log`.

use eagleeye_core::{Agent, AgentId, AgentRepository, AgentStatus, NewAgent, RosterService};
use log::{error, info};
use std::io::{self, BufRead, Write};

/// One selectable menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    ViewAll,
    Add,
    UpdateLocation,
    Delete,
    Search,
    StatusReport,
    AddMissionCount,
    Exit,
}

impl Choice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::ViewAll),
            "2" => Some(Self::Add),
            "3" => Some(Self::UpdateLocation),
            "4" => Some(Self::Delete),
            "5" => Some(Self::Search),
            "6" => Some(Self::StatusReport),
            "7" => Some(Self::AddMissionCount),
            "0" => Some(Self::Exit),
            _ => None,
        }
    }

    fn event_name(self) -> &'static str {
        match self {
            Self::ViewAll => "view_all",
            Self::Add => "add",
            Self::UpdateLocation => "update_location",
            Self::Delete => "delete",
            Self::Search => "search",
            Self::StatusReport => "status_report",
            Self::AddMissionCount => "add_mission_count",
            Self::Exit => "exit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

pub struct Menu<R: AgentRepository, I: BufRead, O: Write> {
    service: RosterService<R>,
    input: I,
    output: O,
}

impl<R: AgentRepository, I: BufRead, O: Write> Menu<R, I, O> {
    pub fn new(service: RosterService<R>, input: I, output: O) -> Self {
        Self {
            service,
            input,
            output,
        }
    }

    /// Runs until the operator picks exit or input ends.
    ///
    /// Only I/O failures on the terminal itself are returned.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.display_main_menu()?;
            let Some(line) = self.read_line()? else {
                break;
            };

            let flow = match Choice::parse(&line) {
                Some(choice) => {
                    info!(
                        "event=menu_select module=cli status=ok choice={}",
                        choice.event_name()
                    );
                    self.dispatch(choice)?
                }
                None => {
                    writeln!(self.output, "\nInvalid choice. Please try again.")?;
                    Flow::Continue
                }
            };

            if flow == Flow::Exit {
                break;
            }
        }

        writeln!(self.output, "\nThank you for using Eagle Eye.")?;
        self.output.flush()
    }

    fn dispatch(&mut self, choice: Choice) -> io::Result<Flow> {
        match choice {
            Choice::ViewAll => self.display_all_agents().map(|()| Flow::Continue),
            Choice::Add => self.add_new_agent(),
            Choice::UpdateLocation => self.update_agent_location(),
            Choice::Delete => self.delete_agent(),
            Choice::Search => self.search_agents(),
            Choice::StatusReport => self.display_status_report().map(|()| Flow::Continue),
            Choice::AddMissionCount => self.add_mission_count(),
            Choice::Exit => Ok(Flow::Exit),
        }
    }

    fn display_main_menu(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n=== MAIN MENU ===")?;
        writeln!(self.output, "1. View All Agents")?;
        writeln!(self.output, "2. Add New Agent")?;
        writeln!(self.output, "3. Update Agent Location")?;
        writeln!(self.output, "4. Delete Agent")?;
        writeln!(self.output, "5. Search Agents")?;
        writeln!(self.output, "6. Status Report")?;
        writeln!(self.output, "7. Add Mission Count")?;
        writeln!(self.output, "0. Exit")?;
        write!(self.output, "\nEnter your choice: ")?;
        self.output.flush()
    }

    fn display_all_agents(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n=== ALL AGENTS ===")?;
        match self.service.list_agents() {
            Ok(agents) if agents.is_empty() => {
                writeln!(self.output, "No agents found in the database.")
            }
            Ok(agents) => self.write_agents(&agents),
            Err(err) => self.report_error("Error retrieving agents", &err),
        }
    }

    fn add_new_agent(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== ADD NEW AGENT ===")?;

        let Some(code_name) = self.prompt("Enter Code Name: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(real_name) = self.prompt("Enter Real Name: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(location) = self.prompt("Enter Location: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(status) = self.prompt("Enter Status (Active/Injured/Missing/Retired): ")? else {
            return Ok(Flow::Exit);
        };
        let Some(missions) = self.prompt("Enter Missions Completed: ")? else {
            return Ok(Flow::Exit);
        };

        let missions_completed = if missions.trim().is_empty() {
            0
        } else {
            match missions.trim().parse::<i64>() {
                Ok(value) => value,
                Err(_) => {
                    writeln!(self.output, "\nInvalid number of missions.")?;
                    return Ok(Flow::Continue);
                }
            }
        };

        // Known statuses are stored in canonical spelling; anything else as typed.
        let status = AgentStatus::parse(&status)
            .map(|known| known.as_str().to_string())
            .unwrap_or(status);

        let agent = NewAgent {
            code_name,
            real_name,
            location,
            status,
            missions_completed,
        };

        match self.service.add_agent(&agent) {
            Ok(created) => writeln!(
                self.output,
                "\nAgent {} added successfully with ID {}.",
                created.code_name, created.id
            )?,
            Err(err) => self.report_error("Error adding agent", &err)?,
        }
        Ok(Flow::Continue)
    }

    fn update_agent_location(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== UPDATE AGENT LOCATION ===")?;
        self.display_all_agents()?;

        let Some(id_text) = self.prompt("\nEnter Agent ID to update: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(id) = parse_id(&id_text) else {
            writeln!(self.output, "\nInvalid Agent ID.")?;
            return Ok(Flow::Continue);
        };
        let Some(location) = self.prompt("Enter new location: ")? else {
            return Ok(Flow::Exit);
        };

        match self.service.relocate(id, &location) {
            Ok(Some(agent)) => writeln!(
                self.output,
                "Agent {} location updated to {}",
                agent.code_name, agent.location
            )?,
            Ok(None) => self.report_not_found(id)?,
            Err(err) => self.report_error("Error updating location", &err)?,
        }
        Ok(Flow::Continue)
    }

    fn delete_agent(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== DELETE AGENT ===")?;
        self.display_all_agents()?;

        let Some(id_text) = self.prompt("\nEnter Agent ID to delete: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(id) = parse_id(&id_text) else {
            writeln!(self.output, "\nInvalid Agent ID.")?;
            return Ok(Flow::Continue);
        };

        match self.service.remove(id) {
            Ok(Some(agent)) => {
                writeln!(self.output, "Agent {} deleted successfully!", agent.code_name)?
            }
            Ok(None) => self.report_not_found(id)?,
            Err(err) => self.report_error("Error deleting agent", &err)?,
        }
        Ok(Flow::Continue)
    }

    fn search_agents(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== SEARCH AGENTS ===")?;
        let Some(term) = self.prompt("Enter partial code name to search: ")? else {
            return Ok(Flow::Exit);
        };

        match self.service.search(term.trim()) {
            Ok(agents) if agents.is_empty() => writeln!(
                self.output,
                "\nNo agents found matching the search term."
            )?,
            Ok(agents) => {
                writeln!(self.output, "\nSearch Results:")?;
                self.write_agents(&agents)?;
            }
            Err(err) => self.report_error("Error searching agents", &err)?,
        }
        Ok(Flow::Continue)
    }

    fn display_status_report(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n=== AGENT STATUS REPORT ===")?;
        match self.service.status_report() {
            Ok(report) => {
                for (status, count) in &report.counts {
                    writeln!(self.output, "  {status}: {count} agents")?;
                }
                writeln!(self.output, "  Total: {} agents", report.total)
            }
            Err(err) => self.report_error("Error generating status report", &err),
        }
    }

    fn add_mission_count(&mut self) -> io::Result<Flow> {
        writeln!(self.output, "\n=== ADD MISSION COUNT ===")?;
        self.display_all_agents()?;

        let Some(id_text) = self.prompt("\nEnter Agent ID: ")? else {
            return Ok(Flow::Exit);
        };
        let Some(id) = parse_id(&id_text) else {
            writeln!(self.output, "\nInvalid Agent ID.")?;
            return Ok(Flow::Continue);
        };
        let Some(delta_text) = self.prompt("Enter number of missions to add: ")? else {
            return Ok(Flow::Exit);
        };
        let Ok(delta) = delta_text.trim().parse::<i64>() else {
            writeln!(self.output, "\nInvalid number of missions.")?;
            return Ok(Flow::Continue);
        };

        match self.service.add_missions(id, delta) {
            Ok(Some(agent)) => writeln!(
                self.output,
                "Agent {} now has {} missions completed",
                agent.code_name, agent.missions_completed
            )?,
            Ok(None) => self.report_not_found(id)?,
            Err(err) => self.report_error("Error updating mission count", &err)?,
        }
        Ok(Flow::Continue)
    }

    fn write_agents(&mut self, agents: &[Agent]) -> io::Result<()> {
        for agent in agents {
            writeln!(self.output, "  ID: {} | {}", agent.id, agent)?;
        }
        Ok(())
    }

    fn report_not_found(&mut self, id: AgentId) -> io::Result<()> {
        writeln!(self.output, "Agent with ID {id} not found.")
    }

    fn report_error(&mut self, context: &str, err: &dyn std::error::Error) -> io::Result<()> {
        error!("event=menu_action module=cli status=error context=\"{context}\" error={err}");
        writeln!(self.output, "Error: {context}: {err}")
    }

    fn prompt(&mut self, label: &str) -> io::Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;
        self.read_line()
    }

    /// Reads one line without its terminator; `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed_len = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed_len);
        Ok(Some(line))
    }
}

fn parse_id(input: &str) -> Option<AgentId> {
    input.trim().parse::<AgentId>().ok()
}
