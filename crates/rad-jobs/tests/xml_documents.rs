use std::collections::BTreeMap;

use proptest::prelude::*;
use rad_jobs::XmlContext;
use rad_matrix::PresenceMap;
use rad_stats::StatisticsSummary;

#[test]
fn presence_documents_use_python_style_flags() {
    let map = PresenceMap::from_flags([true, true, false, true, true]);
    let xml = XmlContext::new();
    let bytes = xml.write_presence("sitesPresent", "site", &map).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.contains(r#"<site id="2" value="False"/>"#), "{text}");
    assert!(text.contains("<sitesPresent>"));
    assert_eq!(xml.read_presence("site", &bytes).unwrap(), map);
}

#[test]
fn namespaced_documents_read_like_plain_ones() {
    let map = PresenceMap::from_flags([true, false, true]);
    let with_ns = XmlContext::with_namespace("http://lifemapper.org");
    let bytes = with_ns.write_presence("layersPresent", "layer", &map).unwrap();
    let text = String::from_utf8(bytes.clone()).unwrap();
    assert!(text.contains(r#"xmlns="http://lifemapper.org""#));
    assert_eq!(XmlContext::new().read_presence("layer", &bytes).unwrap(), map);

    let prefixed = br#"<lm:layersPresent xmlns:lm="urn:x"><lm:layer id="0" value="True"/><lm:layer id="1" value="false"/></lm:layersPresent>"#;
    let read = XmlContext::new().read_presence("layer", prefixed).unwrap();
    assert_eq!(read, PresenceMap::from_flags([true, false]));
}

#[test]
fn bad_flags_are_rejected() {
    let doc = br#"<sitesPresent><site id="0" value="maybe"/></sitesPresent>"#;
    let err = XmlContext::new().read_presence("site", doc).unwrap_err();
    assert_eq!(err.code(), rad_core::errors::codes::XML_READ);
}

#[test]
fn layer_index_maps_columns_to_members() {
    let mut index = BTreeMap::new();
    index.insert(0, "layer_0.npy".to_string());
    index.insert(1, "layer_1.npy".to_string());
    let xml = XmlContext::new();
    let bytes = xml.write_layer_index(&index).unwrap();
    assert_eq!(xml.read_layer_index(&bytes).unwrap(), index);
}

#[test]
fn statistics_document_keeps_undefined_values() {
    let summary = StatisticsSummary {
        whittaker_beta: 1.8,
        lande_beta: f64::NAN,
        legendre_beta: 2.0,
        schluter_sites: None,
        schluter_species: Some(1.0 / 3.0),
    };
    let xml = XmlContext::new();
    let bytes = xml.write_statistics(&summary).unwrap();
    let read = xml.read_statistics(&bytes).unwrap();
    assert_eq!(read.whittaker_beta, 1.8);
    assert!(read.lande_beta.is_nan());
    assert_eq!(read.schluter_sites, None);
    assert_eq!(read.schluter_species, Some(1.0 / 3.0));
}

proptest! {
    #[test]
    fn presence_documents_read_back(flags in prop::collection::vec(any::<bool>(), 0..40)) {
        let map = PresenceMap::from_flags(flags);
        let xml = XmlContext::new();
        let bytes = xml.write_presence("sitesPresent", "site", &map).unwrap();
        prop_assert_eq!(xml.read_presence("site", &bytes).unwrap(), map);
    }
}
