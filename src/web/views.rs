//! HTML pages. Every value that comes from a movement or a form is escaped before it is written.

use crate::model::{Movement, MovementType};
use crate::web::flash::Flash;
use crate::web::form::{FieldError, MovementForm};
use axum::response::Html;
use std::fmt::Write;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(app: &str, title: &str, body: &str) -> Html<String> {
    let app = escape(app);
    Html(format!(
        "<!DOCTYPE html>\n\
         <html lang=\"es\">\n\
         <head><meta charset=\"utf-8\"><title>{title} | {app}</title></head>\n\
         <body>\n\
         <header><h1><a href=\"/\">{app}</a></h1><nav><a href=\"/nuevo\">Nuevo</a></nav></header>\n\
         <main>\n{body}</main>\n\
         </body>\n\
         </html>\n"
    ))
}

/// The list of movements, headed by the pending flash message.
pub fn home(app: &str, flash: Option<Flash>, movements: &[Movement]) -> Html<String> {
    let mut body = String::new();
    if let Some(flash) = flash {
        let _ = writeln!(body, "<p class=\"flash\">{}</p>", escape(flash.message()));
    }
    if movements.is_empty() {
        body.push_str("<p>No hay movimientos.</p>\n");
        return layout(app, "Inicio", &body);
    }

    body.push_str(
        "<table>\n<thead><tr><th>Fecha</th><th>Concepto</th><th>Tipo</th><th>Cantidad</th>\
         <th></th></tr></thead>\n<tbody>\n",
    );
    for movement in movements {
        let date = movement
            .date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        let actions = match movement.id() {
            Some(id) => format!(
                "<a href=\"/editar/{id}\">Editar</a> <a href=\"/eliminar/{id}\">Eliminar</a>"
            ),
            None => String::new(),
        };
        let class = if movement.has_errors() {
            " class=\"invalid\""
        } else {
            ""
        };
        let _ = writeln!(
            body,
            "<tr{class}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{actions}</td></tr>",
            escape(&date),
            escape(movement.concept()),
            movement.kind().label(),
            movement.amount(),
        );
    }
    body.push_str("</tbody>\n</table>\n");
    layout(app, "Inicio", &body)
}

/// Confirms that the movement `id` was deleted.
pub fn deleted(app: &str, id: i64) -> Html<String> {
    layout(
        app,
        "Borrado",
        &format!("<p>El movimiento {id} se ha eliminado.</p>\n<p><a href=\"/\">Volver</a></p>\n"),
    )
}

/// The generic failure page. `detail` is only shown in debug mode.
pub fn error(app: &str, id: i64, detail: Option<&str>) -> Html<String> {
    let mut body = format!("<p>No se ha podido completar la operación sobre el movimiento {id}.</p>\n");
    if let Some(detail) = detail {
        let _ = writeln!(body, "<pre>{}</pre>", escape(detail));
    }
    body.push_str("<p><a href=\"/\">Volver</a></p>\n");
    layout(app, "Error", &body)
}

pub fn not_found(app: &str) -> Html<String> {
    layout(
        app,
        "No encontrado",
        "<p>El movimiento no existe.</p>\n<p><a href=\"/\">Volver</a></p>\n",
    )
}

/// The create or edit form. `action` is the path the form posts to.
pub fn movement_form(
    app: &str,
    title: &str,
    action: &str,
    form: &MovementForm,
    errors: &[FieldError],
) -> Html<String> {
    let field_errors = |field: &str| {
        errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| format!("<span class=\"error\">{}</span>", escape(e.message)))
            .collect::<String>()
    };

    let mut body = String::new();
    let _ = writeln!(body, "<h2>{}</h2>", escape(title));
    let _ = writeln!(body, "<form method=\"post\" action=\"{}\">", escape(action));
    let _ = writeln!(
        body,
        "<input type=\"hidden\" name=\"id\" value=\"{}\">",
        escape(&form.id)
    );
    let _ = writeln!(
        body,
        "<p><label>Fecha <input type=\"date\" name=\"fecha\" value=\"{}\"></label>{}</p>",
        escape(&form.fecha),
        field_errors("fecha")
    );
    let _ = writeln!(
        body,
        "<p><label>Concepto <input type=\"text\" name=\"concepto\" value=\"{}\"></label>{}</p>",
        escape(&form.concepto),
        field_errors("concepto")
    );
    body.push_str("<p>");
    for kind in MovementType::all() {
        let checked = if form.tipo == kind.code() {
            " checked"
        } else {
            ""
        };
        let _ = write!(
            body,
            "<label><input type=\"radio\" name=\"tipo\" value=\"{}\"{checked}> {}</label> ",
            kind.code(),
            kind.label()
        );
    }
    let _ = writeln!(body, "{}</p>", field_errors("tipo"));
    let _ = writeln!(
        body,
        "<p><label>Cantidad <input type=\"number\" step=\"0.01\" name=\"cantidad\" value=\"{}\">\
         </label>{}</p>",
        escape(&form.cantidad),
        field_errors("cantidad")
    );
    body.push_str("<p><button type=\"submit\">Guardar</button></p>\n</form>\n");
    layout(app, title, &body)
}
