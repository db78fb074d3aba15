//! `meshctl config <provider>`: provision, discover contexts, pick one, activate it

use crate::api::{ApiClient, ContextApi};
use crate::auth;
use crate::config::Settings;
use crate::error::{MeshError, Result};
use crate::provision::{Provider, Provisioner, ScriptProvisioner};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{debug, info};

/// What a successful run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureOutcome {
    pub kubeconfig: PathBuf,
    pub context: String,
    /// Raw reply from the control plane
    pub response: String,
}

/// Provision the cluster, discover its contexts, choose one and make it active
pub fn configure<P, A, S>(
    provider: &str,
    provisioner: &P,
    api: &A,
    select: S,
) -> Result<ConfigureOutcome>
where
    P: Provisioner + ?Sized,
    A: ContextApi + ?Sized,
    S: FnOnce(&[String]) -> Result<String>,
{
    let provider: Provider = provider.parse()?;
    let kubeconfig = provisioner.provision(provider)?;

    let contexts = api.list_contexts(&kubeconfig)?;
    info!(count = contexts.len(), "discovered contexts");
    if contexts.is_empty() {
        return Err(MeshError::NoContexts);
    }

    let context = select(&contexts)?;
    debug!(%context, "chosen context");

    let response = api.set_default_context(&kubeconfig, &context)?;
    Ok(ConfigureOutcome {
        kubeconfig,
        context,
        response,
    })
}

/// Entry point used by `main`
pub fn run(provider: &str, settings: &Settings) -> Result<()> {
    auth::ensure_present(&settings.token)?;

    let provisioner = ScriptProvisioner::new(&settings.kubeconfig_out);
    let api = ApiClient::new(settings)?;
    let outcome = configure(provider, &provisioner, &api, super::select_context)?;
    info!(kubeconfig = %outcome.kubeconfig.display(), "generated kubeconfig kept on disk");

    // TODO: pretty-print the control plane reply instead of echoing it raw
    println!("{}", outcome.response);
    eprintln!(
        "{} control plane now uses context {}",
        "Success!".bright_green(),
        outcome.context.bold()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::choose_context;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::path::Path;

    #[derive(Default)]
    struct RecordingProvisioner {
        calls: RefCell<Vec<Provider>>,
    }

    impl Provisioner for RecordingProvisioner {
        fn provision(&self, provider: Provider) -> Result<PathBuf> {
            self.calls.borrow_mut().push(provider);
            Ok(PathBuf::from(format!("/tmp/{}/kubeconfig.yaml", provider)))
        }
    }

    struct FakeApi {
        contexts: Vec<String>,
        listed: RefCell<Vec<PathBuf>>,
        activated: RefCell<Option<String>>,
    }

    impl FakeApi {
        fn with(contexts: &[&str]) -> Self {
            Self {
                contexts: contexts.iter().map(|s| s.to_string()).collect(),
                listed: RefCell::new(Vec::new()),
                activated: RefCell::new(None),
            }
        }
    }

    impl ContextApi for FakeApi {
        fn list_contexts(&self, kubeconfig: &Path) -> Result<Vec<String>> {
            self.listed.borrow_mut().push(kubeconfig.to_path_buf());
            Ok(self.contexts.clone())
        }

        fn set_default_context(&self, _kubeconfig: &Path, context: &str) -> Result<String> {
            *self.activated.borrow_mut() = Some(context.to_string());
            Ok(format!("{{\"contextName\":\"{}\"}}", context))
        }
    }

    fn never_prompt(_: &[String]) -> Result<String> {
        panic!("selection prompt should not run");
    }

    #[test]
    fn test_unknown_provider_runs_nothing() {
        let provisioner = RecordingProvisioner::default();
        let api = FakeApi::with(&["ctx"]);
        let err = configure("eks", &provisioner, &api, never_prompt).unwrap_err();
        assert!(matches!(err, MeshError::Config(_)));
        assert!(provisioner.calls.borrow().is_empty());
        assert!(api.listed.borrow().is_empty());
    }

    #[test]
    fn test_provider_dispatch_uses_returned_path() {
        let provisioner = RecordingProvisioner::default();
        for name in ["minikube", "gke"] {
            let api = FakeApi::with(&["only"]);
            let outcome =
                configure(name, &provisioner, &api, |c: &[String]| Ok(c[0].clone())).unwrap();
            let expected = PathBuf::from(format!("/tmp/{}/kubeconfig.yaml", name));
            assert_eq!(outcome.kubeconfig, expected);
            assert_eq!(api.listed.borrow().as_slice(), &[expected]);
        }
        assert_eq!(
            *provisioner.calls.borrow(),
            vec![Provider::Minikube, Provider::Gke]
        );
    }

    #[test]
    fn test_single_context_activated_without_prompt() {
        let provisioner = RecordingProvisioner::default();
        let api = FakeApi::with(&["minikube"]);
        let mut out = Vec::new();
        let outcome = configure("minikube", &provisioner, &api, |c: &[String]| {
            choose_context(c, &mut Cursor::new(""), &mut out)
        })
        .unwrap();

        assert!(out.is_empty());
        assert_eq!(outcome.context, "minikube");
        assert_eq!(api.activated.borrow().as_deref(), Some("minikube"));
        assert_eq!(outcome.response, r#"{"contextName":"minikube"}"#);
    }

    #[test]
    fn test_second_of_three_is_activated() {
        let provisioner = RecordingProvisioner::default();
        let api = FakeApi::with(&["ctx-a", "ctx-b", "ctx-c"]);
        let mut out = Vec::new();
        let outcome = configure("gke", &provisioner, &api, |c: &[String]| {
            choose_context(c, &mut Cursor::new("2\n"), &mut out)
        })
        .unwrap();

        assert_eq!(outcome.context, "ctx-b");
        assert_eq!(api.activated.borrow().as_deref(), Some("ctx-b"));
    }

    #[test]
    fn test_no_contexts_is_fatal() {
        let provisioner = RecordingProvisioner::default();
        let api = FakeApi::with(&[]);
        let err = configure("minikube", &provisioner, &api, never_prompt).unwrap_err();
        assert!(matches!(err, MeshError::NoContexts));
        assert!(api.activated.borrow().is_none());
    }

    #[test]
    fn test_selection_error_stops_before_activation() {
        let provisioner = RecordingProvisioner::default();
        let api = FakeApi::with(&["a", "b"]);
        let err = configure("minikube", &provisioner, &api, |_: &[String]| {
            Err(MeshError::Cancelled)
        })
        .unwrap_err();
        assert!(matches!(err, MeshError::Cancelled));
        assert!(api.activated.borrow().is_none());
    }
}
