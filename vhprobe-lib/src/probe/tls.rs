use crate::error::*;
use rustls::{
  client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
  crypto::{aws_lc_rs, verify_tls12_signature, verify_tls13_signature, WebPkiSupportedAlgorithms},
  pki_types::{CertificateDer, ServerName, UnixTime},
  ClientConfig, DigitallySignedStruct, SignatureScheme,
};
use std::sync::Arc;

#[derive(Debug)]
/// Accepts any server certificate. Proxies under test serve self-signed certificates.
/// Handshake signatures are still checked.
struct AcceptAnyServerCert(WebPkiSupportedAlgorithms);

impl ServerCertVerifier for AcceptAnyServerCert {
  fn verify_server_cert(
    &self,
    _end_entity: &CertificateDer<'_>,
    _intermediates: &[CertificateDer<'_>],
    _server_name: &ServerName<'_>,
    _ocsp_response: &[u8],
    _now: UnixTime,
  ) -> Result<ServerCertVerified, rustls::Error> {
    Ok(ServerCertVerified::assertion())
  }

  fn verify_tls12_signature(
    &self,
    message: &[u8],
    cert: &CertificateDer<'_>,
    dss: &DigitallySignedStruct,
  ) -> Result<HandshakeSignatureValid, rustls::Error> {
    verify_tls12_signature(message, cert, dss, &self.0)
  }

  fn verify_tls13_signature(
    &self,
    message: &[u8],
    cert: &CertificateDer<'_>,
    dss: &DigitallySignedStruct,
  ) -> Result<HandshakeSignatureValid, rustls::Error> {
    verify_tls13_signature(message, cert, dss, &self.0)
  }

  fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
    self.0.supported_schemes()
  }
}

/// Client config for https probes, without certificate verification
pub(super) fn insecure_client_config() -> HarnessResult<ClientConfig> {
  let provider = Arc::new(aws_lc_rs::default_provider());
  let verifier = AcceptAnyServerCert(provider.signature_verification_algorithms);
  let config = ClientConfig::builder_with_provider(provider)
    .with_safe_default_protocol_versions()?
    .dangerous()
    .with_custom_certificate_verifier(Arc::new(verifier))
    .with_no_client_auth();
  Ok(config)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builds_insecure_config() {
    let config = insecure_client_config().unwrap();
    assert!(config.alpn_protocols.is_empty());
  }
}
