// 3rd party imports
use anyhow::Result;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// Root tag of the MSGF summary payload
///
pub const MSGF_SUMMARY_ROOT: &str = "MSGF_SummaryStats";

/// Root tag of the DTA-Refinery mass error payload
///
pub const DTA_REFINERY_ROOT: &str = "DTARef_MassErrorStats";

/// Builds the payload of the stored procedure call:
/// `<Root><Dataset/><PSM_Source_Job/><Measurements><Measurement Name="..">value</Measurement>..</Measurements></Root>`
///
/// # Arguments
/// * `root` - Root tag
/// * `dataset` - Dataset name
/// * `job` - Job which produced the measurements
/// * `measurements` - Named values
///
pub fn build_payload(
    root: &str,
    dataset: &str,
    job: u32,
    measurements: &[(&str, String)],
) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Start(BytesStart::new(root)))?;
    write_text_element(&mut writer, "Dataset", dataset)?;
    write_text_element(&mut writer, "PSM_Source_Job", &job.to_string())?;
    writer.write_event(Event::Start(BytesStart::new("Measurements")))?;
    for (name, value) in measurements {
        writer.write_event(Event::Start(
            BytesStart::new("Measurement").with_attributes([("Name", *name)]),
        ))?;
        writer.write_event(Event::Text(BytesText::new(value)))?;
        writer.write_event(Event::End(BytesEnd::new("Measurement")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Measurements")))?;
    writer.write_event(Event::End(BytesEnd::new(root)))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_payload() {
        let payload = build_payload(
            DTA_REFINERY_ROOT,
            "QC_Shew<1>",
            1234,
            &[("MassErrorPPM", "-1.5".to_string()), ("PSMCount", "100".to_string())],
        )
        .unwrap();
        assert_eq!(
            payload,
            "<DTARef_MassErrorStats><Dataset>QC_Shew&lt;1&gt;</Dataset><PSM_Source_Job>1234</PSM_Source_Job>\
             <Measurements><Measurement Name=\"MassErrorPPM\">-1.5</Measurement>\
             <Measurement Name=\"PSMCount\">100</Measurement></Measurements></DTARef_MassErrorStats>"
        );
    }
}
