use std::path::Path;

use domain_glidein::exception::GlideinResult;
use domain_glidein::model::vo::job::CREDENTIAL_FILE;

/// Persist a delegated credential under a resource's working directory so a
/// later event can submit jobs with it. Restricted to the service user.
pub(crate) async fn store(working_dir: &Path, credential: &str) -> GlideinResult<()> {
    tokio::fs::create_dir_all(working_dir).await?;
    let path = working_dir.join(CREDENTIAL_FILE);
    tokio::fs::write(&path, credential).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    Ok(())
}

pub(crate) async fn load(working_dir: &Path) -> GlideinResult<String> {
    Ok(tokio::fs::read_to_string(working_dir.join(CREDENTIAL_FILE)).await?)
}
