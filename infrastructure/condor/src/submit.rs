use domain_glidein::exception::GlideinResult;
use domain_glidein::model::vo::job::{self, CondorGridType, CondorUniverse, JobSpec};

/// Render a job specification as the submit-description text fed to
/// `condor_submit`. Pure; the only output is the returned string. Optional
/// fields that are unset emit no line at all.
pub fn submit_description(spec: &JobSpec) -> GlideinResult<String> {
    spec.validate()?;

    let mut out = String::new();
    let dir = spec.job_dir.display();

    out.push_str(&format!("universe = {}\n", spec.universe.type_str()));

    if spec.universe == CondorUniverse::Grid {
        // validate() guarantees both are present under the grid universe
        let grid_type = spec.grid_type.unwrap_or(CondorGridType::Gt2);
        let contact = spec.grid_contact.as_deref().unwrap_or_default();
        out.push_str(&format!("grid_resource = {} {}\n", grid_type.type_str(), contact));

        // Streaming defaults to True; everything goes through files instead.
        out.push_str("stream_input = False\n");
        out.push_str("stream_output = False\n");
        out.push_str("stream_error = False\n");
        out.push_str("transfer_input = True\n");
        out.push_str("transfer_output = True\n");
        out.push_str("transfer_error = True\n");

        match grid_type {
            CondorGridType::Gt2 | CondorGridType::Gt5 => {
                out.push_str("globus_rsl = ");
                if let Some(project) = &spec.project {
                    out.push_str(&format!("(project={project})"));
                }
                if let Some(queue) = &spec.queue {
                    out.push_str(&format!("(queue={queue})"));
                }
                out.push_str(&format!("(hostCount={})", spec.host_count));
                out.push_str(&format!("(count={})", spec.host_count * spec.process_count));
                out.push_str("(jobType=multiple)");
                out.push_str(&format!("(maxTime={})\n", spec.max_wall_time));
            }
            CondorGridType::Gt4 => {
                out.push_str("globus_xml = ");
                out.push_str(&format!("<count>{}</count>", spec.host_count * spec.process_count));
                out.push_str(&format!("<hostCount>{}</hostCount>", spec.host_count));
                if let Some(project) = &spec.project {
                    out.push_str(&format!("<project>{project}</project>"));
                }
                if let Some(queue) = &spec.queue {
                    out.push_str(&format!("<queue>{queue}</queue>"));
                }
                out.push_str(&format!("<maxTime>{}</maxTime>", spec.max_wall_time));
                out.push_str("<jobType>multiple</jobType>\n");
            }
            CondorGridType::Condor => {}
        }

        if spec.credential.is_some() {
            out.push_str(&format!("x509userproxy = {dir}/{}\n", job::CREDENTIAL_FILE));
        }
    }

    out.push_str(&format!("executable = {}\n", spec.executable));
    if !spec.local_executable {
        out.push_str("transfer_executable = false\n");
    }

    if !spec.arguments.is_empty() {
        out.push_str(&format!("arguments = \"{}\"\n", spec.arguments.join(" ")));
    }

    if !spec.environment.is_empty() {
        let vars: Vec<String> =
            spec.environment.iter().map(|(name, value)| format!("{name}={value}")).collect();
        out.push_str(&format!("environment = {}\n", vars.join(" ")));
    }

    out.push_str(&format!("log = {dir}/{}\n", job::LOG_FILE));
    out.push_str(&format!("output = {dir}/{}\n", job::OUTPUT_FILE));
    out.push_str(&format!("error = {dir}/{}\n", job::ERROR_FILE));

    out.push_str("notification = Never\n");

    if let Some(requirements) = &spec.requirements {
        out.push_str(&format!("requirements = {requirements}\n"));
    }

    if let Some(remote_dir) = &spec.remote_dir {
        out.push_str(&format!("remote_initialdir = {remote_dir}\n"));
    }
    out.push_str(&format!("initialdir = {dir}\n"));

    if !spec.input_files.is_empty() {
        out.push_str(&format!("transfer_input_files = {}\n", spec.input_files.join(",")));
    }
    if !spec.output_files.is_empty() {
        out.push_str(&format!("transfer_output_files = {}\n", spec.output_files.join(",")));
    }
    if !spec.input_files.is_empty() || !spec.output_files.is_empty() {
        out.push_str("when_to_transfer_output = ON_EXIT\n");
    }

    out.push_str("queue\n");

    Ok(out)
}
