use cred_minter::crd::CredentialsRequest;
use kube::CustomResourceExt;

fn main() {
    print!(
        "{}",
        serde_yaml::to_string(&CredentialsRequest::crd()).unwrap()
    );
}
