//! CSV export of the full tickets/technicians tables.
//!
//! One header row of field names, one row per record, fields in
//! table-declaration order.

use servicefix_common::{ServiceFixError, Technician, Ticket};

fn csv_error(err: csv::Error) -> ServiceFixError {
    ServiceFixError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ServiceFixError> {
    writer
        .into_inner()
        .map_err(|e| ServiceFixError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

pub fn tickets_csv(tickets: &[Ticket]) -> Result<Vec<u8>, ServiceFixError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id",
            "chat_id",
            "appliance",
            "issue_summary",
            "location",
            "preferred_time",
            "raw_problem_text",
            "status",
            "technician_id",
            "created_at",
        ])
        .map_err(csv_error)?;

    for t in tickets {
        writer
            .write_record([
                t.id.to_string().as_str(),
                t.chat_id.to_string().as_str(),
                opt(&t.appliance),
                opt(&t.issue_summary),
                opt(&t.location),
                opt(&t.preferred_time),
                opt(&t.raw_problem_text),
                t.status.as_str(),
                t.technician_id
                    .map(|id| id.to_string())
                    .unwrap_or_default()
                    .as_str(),
                t.created_at.format("%Y-%m-%d %H:%M:%S").to_string().as_str(),
            ])
            .map_err(csv_error)?;
    }
    finish(writer)
}

pub fn technicians_csv(techs: &[Technician]) -> Result<Vec<u8>, ServiceFixError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "id",
            "chat_id",
            "name",
            "phone",
            "skills",
            "status",
            "created_at",
        ])
        .map_err(csv_error)?;

    for t in techs {
        writer
            .write_record([
                t.id.to_string().as_str(),
                t.chat_id.to_string().as_str(),
                opt(&t.name),
                opt(&t.phone),
                opt(&t.skills),
                t.status.as_str(),
                t.created_at.format("%Y-%m-%d %H:%M:%S").to_string().as_str(),
            ])
            .map_err(csv_error)?;
    }
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use servicefix_common::{TechStatus, TicketStatus};

    #[test]
    fn header_matches_table_declaration_order() {
        let bytes = tickets_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text.trim_end(),
            "id,chat_id,appliance,issue_summary,location,preferred_time,\
             raw_problem_text,status,technician_id,created_at"
        );

        let bytes = technicians_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.trim_end(), "id,chat_id,name,phone,skills,status,created_at");
    }

    #[test]
    fn one_row_per_record() {
        let created = chrono::NaiveDateTime::parse_from_str(
            "2026-08-01 09:30:00",
            "%Y-%m-%d %H:%M:%S",
        )
        .unwrap();
        let tickets = vec![Ticket {
            id: 1,
            chat_id: 42,
            appliance: Some("AC".into()),
            issue_summary: Some("No Cooling".into()),
            location: Some("Visakhapatnam, Andhra Pradesh".into()),
            preferred_time: None,
            raw_problem_text: Some("warm air".into()),
            status: TicketStatus::New,
            technician_id: None,
            created_at: created,
        }];
        let text = String::from_utf8(tickets_csv(&tickets).unwrap()).unwrap();
        let lines: Vec<&str> = text.trim_end().lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("1,42,AC,No Cooling,"));
        assert!(lines[1].contains("2026-08-01 09:30:00"));

        let techs = vec![Technician {
            id: 1,
            chat_id: 7,
            name: Some("Raju".into()),
            phone: Some("9876543210".into()),
            skills: Some("AC, Fridge".into()),
            status: TechStatus::Pending,
            created_at: created,
        }];
        let text = String::from_utf8(technicians_csv(&techs).unwrap()).unwrap();
        assert!(text.contains("Raju"));
        assert!(text.contains("pending"));
    }
}
